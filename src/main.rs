use std::{
    env, fs,
    io::{self, Read},
    path::{Path, PathBuf},
    process::ExitCode,
};

use dotenv::dotenv;

use wikitext_fixer::{
    CanonicalizeOptions, FixError, MwsConfig, convert_html, decode_fragment, normalize, resolve_origin,
    wikitext::Result,
};

const USAGE: &str = "usage: wikitext_fixer <command> [args]

commands:
  normalize [FILE]                               apply typographic style
  html [FILE]                                    convert HTML to wikitext
  fix [FILE] [--config PATH] [--no-typography]   rewrite same-wiki links
  fragment TEXT                                  decode a section anchor
  origin ENDPOINT                                print origin and base dir

FILE defaults to stdin. MWS_API_URL and MWS_FIX_TYPOGRAPHY override the config.";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Normalize(Option<PathBuf>),
    Html(Option<PathBuf>),
    Fix {
        file: Option<PathBuf>,
        config: Option<PathBuf>,
        typography: bool,
    },
    Fragment(String),
    Origin(String),
}

fn optional_file(rest: &[String]) -> Result<Option<PathBuf>> {
    match rest {
        [] => Ok(None),
        [file] => Ok(Some(PathBuf::from(file))),
        _ => Err(FixError::invalid_arg("too many arguments")),
    }
}

fn single_value(rest: &[String], what: &str) -> Result<String> {
    match rest {
        [value] => Ok(value.clone()),
        _ => Err(FixError::invalid_arg(format!("expected exactly one {}", what))),
    }
}

fn parse_args(args: &[String]) -> Result<Command> {
    let Some((command, rest)) = args.split_first() else {
        return Err(FixError::invalid_arg("missing command"));
    };
    match command.as_str() {
        "normalize" => Ok(Command::Normalize(optional_file(rest)?)),
        "html" => Ok(Command::Html(optional_file(rest)?)),
        "fragment" => Ok(Command::Fragment(single_value(rest, "fragment")?)),
        "origin" => Ok(Command::Origin(single_value(rest, "endpoint")?)),
        "fix" => {
            let mut file = None;
            let mut config = None;
            let mut typography = true;
            let mut iter = rest.iter();
            while let Some(arg) = iter.next() {
                match arg.as_str() {
                    "--config" => {
                        let path = iter
                            .next()
                            .ok_or_else(|| FixError::invalid_arg("--config needs a path"))?;
                        config = Some(PathBuf::from(path));
                    }
                    "--no-typography" => typography = false,
                    flag if flag.starts_with("--") => {
                        return Err(FixError::invalid_arg(format!("unknown option {}", flag)));
                    }
                    _ if file.is_none() => file = Some(PathBuf::from(arg)),
                    _ => return Err(FixError::invalid_arg("too many arguments")),
                }
            }
            Ok(Command::Fix {
                file,
                config,
                typography,
            })
        }
        other => Err(FixError::invalid_arg(format!("unknown command {}", other))),
    }
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => {
            log::info!("Reading {:?}", path);
            fs::read_to_string(path).map_err(|e| FixError::io_err(format!("cannot read {}", path.display()), e))
        }
        None => {
            log::info!("Reading stdin");
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn run(command: Command) -> Result<String> {
    match command {
        Command::Normalize(file) => {
            log::info!("Normalizing typography");
            Ok(normalize(&read_input(file.as_deref())?))
        }
        Command::Html(file) => {
            log::info!("Converting HTML");
            Ok(convert_html(&read_input(file.as_deref())?))
        }
        Command::Fix {
            file,
            config,
            typography,
        } => {
            let settings = MwsConfig::from_sources(config.as_deref())?;
            let site = settings.site()?;
            let options = CanonicalizeOptions {
                also_normalize: typography && settings.fix_typography(),
            };
            log::info!("Fixing links for {} (base {})", site.origin, site.base_dir);
            let text = read_input(file.as_deref())?;
            let fixed = site.canonicalize(&text, options);
            if fixed == text {
                log::info!("Nothing to fix");
            }
            Ok(fixed)
        }
        Command::Fragment(fragment) => Ok(decode_fragment(&fragment)),
        Command::Origin(endpoint) => {
            let (origin, base_dir) = resolve_origin(&endpoint);
            if origin.is_empty() {
                return Err(FixError::invalid_arg(format!("cannot resolve an origin from {:?}", endpoint)));
            }
            Ok(format!("{}\n{}", origin, base_dir))
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();
    dotenv().ok();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            return ExitCode::from(2);
        }
    };

    match run(command) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            eprintln!("{}", e);
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_simple_commands() {
        assert_eq!(parse_args(&args(&["normalize"])).unwrap(), Command::Normalize(None));
        assert_eq!(
            parse_args(&args(&["html", "page.html"])).unwrap(),
            Command::Html(Some(PathBuf::from("page.html")))
        );
        assert_eq!(
            parse_args(&args(&["fragment", ".D0.9F"])).unwrap(),
            Command::Fragment(".D0.9F".to_string())
        );
    }

    #[test]
    fn parses_fix_options() {
        let cmd = parse_args(&args(&["fix", "--no-typography", "page.wiki", "--config", "c.json"])).unwrap();
        assert_eq!(
            cmd,
            Command::Fix {
                file: Some(PathBuf::from("page.wiki")),
                config: Some(PathBuf::from("c.json")),
                typography: false,
            }
        );
    }

    #[test]
    fn usage_errors() {
        let cases: [&[&str]; 6] = [
            &[],
            &["frobnicate"],
            &["fragment"],
            &["fix", "--config"],
            &["fix", "--loud"],
            &["normalize", "a", "b"],
        ];
        for bad in cases {
            let err = parse_args(&args(bad)).unwrap_err();
            assert_eq!(err.kind(), "InvalidArgument", "{:?}", bad);
        }
    }

    #[test]
    fn origin_and_fragment_commands() {
        assert_eq!(
            run(Command::Origin("https://wiki.example.org/w/api.php".to_string())).unwrap(),
            "https://wiki.example.org\n/w/"
        );
        assert!(run(Command::Origin(String::new())).is_err());
        assert_eq!(run(Command::Fragment("See_also".to_string())).unwrap(), "See also");
    }
}
