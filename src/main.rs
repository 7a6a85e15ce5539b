use std::ffi::{OsStr, OsString};
use std::io::{Read, Write};
use std::path::PathBuf;

use miette::{IntoDiagnostic, Result};
use subc::CodegenOptions;

struct Args {
    mode: Mode,
    input: clio::Input,
    input_name: OsString,
    output: Option<OsString>,
}

#[derive(Clone, Copy)]
enum Mode {
    Lex,
    Ast,
    Asm,
}

impl Args {
    fn help() -> String {
        let help = r#"_Usage_: *subc* <mode> <input> [-o output]

_Arguments_:
    *mode*        Mode of the compiler, can be one of:
                    *-lex*        Print the token stream
                    *-ast*        Pretty-print the syntax tree
                    *-asm*        Generate AArch64 assembly
                    *-help*       Print this help message
    *input*       Input file, use - for stdin
    *-o output*   Output file, use - for stdout. Defaults to stdout, or to
                  the input with a `.s` extension for *-asm*"#;

        markup(help)
    }

    /// Parse command line arguments, return Err if failed.
    fn try_parse() -> Result<Self, String> {
        let mut args = std::env::args_os();
        args.next(); // skip program name

        // Parse mode
        let mode = args.next().ok_or("missing argument `mode`")?;
        let mode = match mode.to_str() {
            Some("-lex") => Mode::Lex,
            Some("-ast") => Mode::Ast,
            Some("-asm") => Mode::Asm,
            Some("-help") => {
                // Print help message and exit
                println!("{}", Self::help());
                std::process::exit(0);
            }
            _ => return Err(format!("invalid mode: {}", mode.to_string_lossy())),
        };

        // Parse input
        let input_name = args.next().ok_or("missing argument `input`")?;
        let input = clio::Input::new(&input_name).map_err(|err| err.to_string())?;

        // Parse output. Missing output is allowed.
        let output = match args.next() {
            None => None,
            Some(flag) if flag == "-o" => {
                Some(args.next().ok_or("missing file name after `-o`")?)
            }
            Some(other) => return Err(format!("unexpected argument: {}", other.to_string_lossy())),
        };

        Ok(Self {
            mode,
            input,
            input_name,
            output,
        })
    }

    /// Parse command line arguments, print help message and exit if failed.
    fn parse() -> Self {
        Self::try_parse().unwrap_or_else(|err| {
            eprintln!("{}: {}", markup("_Error_"), err);
            eprintln!("{}", Self::help());
            std::process::exit(1);
        })
    }

    /// Where the result goes. `-` is stdout.
    fn output_path(&self) -> OsString {
        match (&self.output, self.mode) {
            (Some(output), _) => output.clone(),
            (None, Mode::Asm) if self.input_name != "-" => {
                PathBuf::from(&self.input_name).with_extension("s").into_os_string()
            }
            (None, _) => "-".into(),
        }
    }
}

/// Run the pipeline up to `mode` and render the result.
fn render(mode: Mode, source: &str) -> Result<String> {
    let text = match mode {
        Mode::Lex => subc::lex(source)?
            .iter()
            .map(|token| format!("{}\n", token))
            .collect::<String>(),
        Mode::Ast => subc::parse(source)?.to_string(),
        Mode::Asm => subc::compile(source, &CodegenOptions::default())?.to_string(),
    };
    Ok(text)
}

/// Render `source` and write it to `output`. No file is left at `output`
/// when rendering or writing fails.
fn emit(mode: Mode, source: &str, output: &OsStr) -> Result<()> {
    let remove = || {
        if output != "-" {
            let _ = std::fs::remove_file(output);
        }
    };

    let text = render(mode, source).map_err(|err| {
        remove();
        err
    })?;

    let written = clio::Output::new(output).into_diagnostic().and_then(|mut file| {
        file.write_all(text.as_bytes()).into_diagnostic()?;
        file.finish().into_diagnostic()
    });
    if written.is_err() {
        remove();
    }
    written
}

fn main() -> Result<()> {
    // Parse command line arguments
    let mut args = Args::parse();
    let output = args.output_path();

    // Read input
    let mut source = String::new();
    args.input.read_to_string(&mut source).into_diagnostic()?;

    // Compile and write
    emit(args.mode, &source, &output).map_err(|err| err.with_source_code(source))
}

/// Simple markup for help message.
///
/// * `_underline_`
/// * `*bold*`
fn markup(s: &str) -> String {
    use owo_colors::OwoColorize;
    use regex::{Captures, Regex};

    Regex::new(r"_(?P<underline>.*?)_|\*(?P<bold>.*?)\*")
        .unwrap()
        .replace_all(s, |caps: &Captures| {
            if let Some(s) = caps.name("bold") {
                return s.as_str().bold().to_string();
            }
            if let Some(s) = caps.name("underline") {
                return s.as_str().bold().underline().to_string();
            }
            unreachable!()
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use subc::parser::ParseError;

    fn scratch_file(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("subc-{}-{}.s", std::process::id(), name));
        std::fs::write(&path, "stale").unwrap();
        path
    }

    fn emit_to(source: &str, path: &Path) -> Result<()> {
        emit(Mode::Asm, source, path.as_os_str())
    }

    #[test]
    fn failed_compile_removes_output() {
        let path = scratch_file("goto");
        let err = emit_to("int main() { goto nowhere; }", &path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ParseError>(),
            Some(ParseError::UndefinedSymbol { .. })
        ));
        assert!(!path.exists());

        let path = scratch_file("break");
        let err = emit_to("int main() { break; }", &path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ParseError>(),
            Some(ParseError::BreakOutsideLoop { .. })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn successful_compile_replaces_output() {
        let path = scratch_file("ok");
        emit_to("int main() { return 3; }", &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(text.starts_with(".global _main\n"));
        assert!(text.contains("  mov w0, #3\n"));
    }

    #[test]
    fn failed_write_leaves_nothing() {
        let dir = std::env::temp_dir().join(format!("subc-{}-missing", std::process::id()));
        let path = dir.join("out.s");
        assert!(emit_to("int main() { return 0; }", &path).is_err());
        assert!(!path.exists());
    }
}
