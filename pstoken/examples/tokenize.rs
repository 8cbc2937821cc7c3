//! A small example that shows how to tokenize a PostScript program.
//!
//! Run with `--binary` to print the objects as a binary object sequence
//! instead.

#![allow(missing_docs)]

use pstoken::{BinaryFormat, ByteSource, Encoder, IoSource, NameCache, Object, Scanner, Value};
use std::env;
use std::fs::File;
use std::io::BufReader;
use std::process;

fn main() {
    if let Ok(()) = log::set_logger(&LOGGER) {
        log::set_max_level(log::LevelFilter::Warn);
    }

    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("Usage: tokenize <file> [--binary]");
        process::exit(1);
    };
    let binary = args.next().is_some_and(|a| a == "--binary");

    let file = match File::open(&path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            process::exit(1);
        }
    };

    let mut src = IoSource::new(BufReader::new(file));
    let mut names = NameCache::new();
    let mut scanner = Scanner::default();
    let mut objects = vec![];

    loop {
        let line = src.current_line().abs();

        match scanner.scan(&mut src, &mut names, &mut ()) {
            Ok(Some(object)) => {
                if binary {
                    objects.push(object);
                } else {
                    print!("{line}: ");
                    print_object(&object);
                    println!();
                }
            }
            Ok(None) => break,
            Err(e) => {
                eprintln!("Error on line {line}: {e}");
                process::exit(1);
            }
        }
    }

    if binary {
        match Encoder::new(BinaryFormat::BIG_ENDIAN_IEEE).encode_all(&objects) {
            Ok(data) => {
                for chunk in data.chunks(16) {
                    let hex = chunk.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>();
                    println!("{}", hex.join(" "));
                }
            }
            Err(e) => {
                eprintln!("Error encoding: {e}");
                process::exit(1);
            }
        }
    }
}

fn print_object(object: &Object) {
    match object.value() {
        Value::Null => print!("null"),
        Value::Mark => print!("mark"),
        Value::Integer(n) => print!("Integer({n})"),
        Value::Real(r) => print!("Real({})", r.value()),
        Value::Infinity => print!("Real(inf)"),
        Value::Boolean(b) => print!("Boolean({b})"),
        Value::Name(name) => {
            let kind = if object.is_executable() {
                "executable"
            } else {
                "literal"
            };
            let text = name.as_str().unwrap_or("<non-utf8 name>");
            print!("Name({text}, {kind})");
        }
        Value::String(s) => print!("String({})", String::from_utf8_lossy(s)),
        Value::Array(elements) => {
            let (open, close) = if object.is_executable() {
                ("{", "}")
            } else {
                ("[", "]")
            };

            print!("{open}");
            for (i, element) in elements.iter().enumerate() {
                if i > 0 {
                    print!(" ");
                }
                print_object(element);
            }
            print!("{close}");
        }
    }
}

/// A simple stderr logger.
static LOGGER: SimpleLogger = SimpleLogger;
struct SimpleLogger;
impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::LevelFilter::Warn
    }

    fn log(&self, record: &log::Record<'_>) {
        if self.enabled(record.metadata()) {
            let line = record.line().unwrap_or(0);
            let args = record.args();

            match record.level() {
                log::Level::Error => eprintln!("Error (in {}:{}): {}", record.target(), line, args),
                log::Level::Warn => eprintln!("Warning (in {}:{}): {}", record.target(), line, args),
                _ => eprintln!("{} (in {}:{}): {}", record.level(), record.target(), line, args),
            }
        }
    }

    fn flush(&self) {}
}
