// lingoc - Lingo script compiler
// Compiles one Lingo script and prints its bytecode listing and diagnostics

use std::env;
use std::fs;
use std::process;

use lingoc::lingo_compiler::disasm::disassemble_unit;
use lingoc::lingo_compiler::{CompilerConfig, LingoCompiler};

fn main() {
    // Initialize logging
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage(&args[0]);
        process::exit(1);
    }

    let mut input_file = "";
    let mut config_file: Option<String> = None;
    let mut output_file: Option<String> = None;
    let mut quiet = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: --config requires a filename");
                    process::exit(1);
                }
                config_file = Some(args[i + 1].clone());
                i += 2;
            }
            "-o" | "--output" => {
                if i + 1 >= args.len() {
                    eprintln!("Error: -o requires a filename");
                    process::exit(1);
                }
                output_file = Some(args[i + 1].clone());
                i += 2;
            }
            "-q" | "--quiet" => {
                quiet = true;
                i += 1;
            }
            "-h" | "--help" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            arg if arg.starts_with('-') => {
                eprintln!("Error: Unknown option '{}'", arg);
                print_usage(&args[0]);
                process::exit(1);
            }
            _ => {
                if input_file.is_empty() {
                    input_file = &args[i];
                } else {
                    eprintln!("Error: Multiple input files specified");
                    process::exit(1);
                }
                i += 1;
            }
        }
    }

    if input_file.is_empty() {
        eprintln!("Error: No input file specified");
        print_usage(&args[0]);
        process::exit(1);
    }

    let config = match config_file {
        Some(path) => match CompilerConfig::load(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Error loading '{}': {}", path, err);
                process::exit(1);
            }
        },
        None => CompilerConfig::default(),
    };

    let source = match fs::read_to_string(input_file) {
        Ok(content) => content,
        Err(err) => {
            eprintln!("Error reading '{}': {}", input_file, err);
            process::exit(1);
        }
    };

    let compiler = LingoCompiler::with_config(config);
    let output = match compiler.compile(&source) {
        Ok(output) => output,
        Err(err) => {
            eprintln!("Compilation error: {}", err);
            process::exit(1);
        }
    };

    if !quiet {
        print!("{}", disassemble_unit(&output.script));
    }
    for diagnostic in output.diagnostics.iter() {
        eprintln!("{}: {}", input_file, diagnostic);
    }
    if output.diagnostics.dropped() > 0 {
        eprintln!(
            "{}: {} more diagnostic(s) not shown",
            input_file,
            output.diagnostics.dropped()
        );
    }

    if output.had_error() {
        process::exit(1);
    }

    if let Some(path) = output_file {
        if let Err(err) = fs::write(&path, output.script.code.to_le_bytes()) {
            eprintln!("Error writing '{}': {}", path, err);
            process::exit(1);
        }
    }
}

fn print_usage(program_name: &str) {
    println!("Usage: {} [options] <script.lingo>", program_name);
    println!();
    println!("Options:");
    println!("  --config <file>        Compiler settings (TOML)");
    println!("  -o, --output <file>    Write top-level bytecode words (little-endian)");
    println!("  -q, --quiet            Only print diagnostics");
    println!("  -h, --help             Show this help message");
}
