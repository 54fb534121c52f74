// tamarin - A small expression-oriented scripting language written in Rust
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use tamarin_core::{Env, Value, eval};
use tamarin_parser::{ParseError, parse};
use tamarin_vm::{Compiler, GLOBALS_SIZE, SymbolTable, VM};

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut use_vm = false;
    let mut files = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "--version" | "-v" => {
                println!("Tamarin v0.1.0");
                return;
            }
            "--vm" => use_vm = true,
            _ => files.push(arg.clone()),
        }
    }

    // If files provided, evaluate them; otherwise start the REPL.
    if files.is_empty() {
        run_repl(use_vm);
    } else {
        run_files(&files, use_vm);
    }
}

/// Evaluate a sequence of source files
fn run_files(files: &[String], use_vm: bool) {
    for file_path in files {
        if let Err(e) = run_file(file_path, use_vm) {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

/// Evaluate a single source file
fn run_file(file_path: &str, use_vm: bool) -> Result<(), String> {
    let path = Path::new(file_path);

    // Validate file extension
    match path.extension().and_then(|e| e.to_str()) {
        Some("tam") => {}
        Some(ext) => {
            return Err(format!(
                "Error: unsupported file extension '.{}' for '{}'",
                ext, file_path
            ));
        }
        None => {
            return Err(format!(
                "Error: file '{}' has no extension (expected .tam)",
                file_path
            ));
        }
    }

    let source =
        fs::read_to_string(path).map_err(|e| format!("Error reading '{}': {}", file_path, e))?;

    let (program, errors) = parse(&source);
    if !errors.is_empty() {
        let messages: Vec<String> = errors.iter().map(|e| format!("\t{}", e)).collect();
        return Err(format!(
            "Parse errors in '{}':\n{}",
            file_path,
            messages.join("\n")
        ));
    }

    if use_vm {
        let mut compiler = Compiler::new();
        compiler
            .compile(&program)
            .map_err(|e| format!("Compilation failed in '{}': {}", file_path, e))?;
        let mut vm = VM::new(compiler.bytecode());
        vm.run()
            .map_err(|e| format!("Error in '{}': {}", file_path, e))?;
    } else {
        let env = Env::new();
        if let Value::Error(message) = eval(&program, &env) {
            return Err(format!("Error in '{}': {}", file_path, message));
        }
    }

    Ok(())
}

/// Run the interactive REPL on the chosen back-end
fn run_repl(use_vm: bool) {
    println!("Tamarin v0.1.0");
    if use_vm {
        repl_vm();
    } else {
        repl_eval();
    }
}

/// REPL loop backed by the tree-walking evaluator; the environment
/// persists across lines.
fn repl_eval() {
    let env = Env::new();

    while let Some(line) = read_line() {
        let Some(program) = parse_line(&line) else {
            continue;
        };
        println!("{}", eval(&program, &env));
    }
}

/// REPL loop backed by the compiler and VM; the symbol table, constant
/// pool, and globals persist across lines.
fn repl_vm() {
    let mut state: Option<(SymbolTable, Vec<Value>)> = None;
    let mut globals = vec![Value::Null; GLOBALS_SIZE];

    while let Some(line) = read_line() {
        let Some(program) = parse_line(&line) else {
            continue;
        };

        let mut compiler = match state.take() {
            Some((symbol_table, constants)) => Compiler::with_state(symbol_table, constants),
            None => Compiler::new(),
        };

        if let Err(e) = compiler.compile(&program) {
            eprintln!("Compilation failed: {}", e);
            state = Some(compiler.into_state());
            continue;
        }

        let bytecode = compiler.bytecode();
        state = Some(compiler.into_state());

        let mut vm = VM::with_globals(bytecode, globals);
        match vm.run() {
            Ok(()) => println!("{}", vm.last_popped()),
            Err(e) => eprintln!("Runtime error: {}", e),
        }
        globals = vm.into_globals();
    }
}

/// Prompt for and read one line. Returns None at end of input.
fn read_line() -> Option<String> {
    print!(">> ");
    io::stdout().flush().ok()?;

    let mut input = String::new();
    match io::stdin().read_line(&mut input) {
        Ok(0) => {
            println!();
            None
        }
        Ok(_) => Some(input),
        Err(e) => {
            eprintln!("Read error: {}", e);
            None
        }
    }
}

/// Parse one REPL line, printing any parse errors. Returns None for
/// blank lines and failed parses.
fn parse_line(line: &str) -> Option<tamarin_parser::Program> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (program, errors) = parse(line);
    if !errors.is_empty() {
        print_parse_errors(&errors);
        return None;
    }
    Some(program)
}

fn print_parse_errors(errors: &[ParseError]) {
    eprintln!("Parse errors:");
    for error in errors {
        eprintln!("\t{}", error);
    }
}
