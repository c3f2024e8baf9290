use anyhow::{Context, Result, anyhow, bail};
use latweb::{
    about,
    backend::{Backend, HttpBackend},
    config,
    form_shell::{execute_shell_command, parse_shell_line, parse_shell_tokens},
    form_state::FormState,
    query::build_request,
    results::{CodeLanguage, ResultSummary, SearchResult, code_snippet},
    search::{SearchSession, SearchStatus},
    store::{Action, FormStore},
};
use serde::Serialize;
use std::{
    env,
    io::{self, BufRead, Write},
    path::Path,
    sync::Arc,
};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_STATE_PATH: &str = ".latweb_state.json";

fn usage() {
    eprintln!(
        "Usage:\n  \
  latweb_cli --version\n  \
  latweb_cli [OPTIONS] init\n  \
  latweb_cli [OPTIONS] view\n  \
  latweb_cli [OPTIONS] request\n  \
  latweb_cli [OPTIONS] backend-version\n  \
  latweb_cli [OPTIONS] submit [--copy-gen] [--code c|python|matlab]\n  \
  latweb_cli [OPTIONS] shell   (adds: submit, backend-version, quit)\n  \
  latweb_cli [OPTIONS] <form command...>   (see: latweb_cli help)\n\n  \
  OPTIONS: --state PATH, --backend URL, -v (repeat for more detail)"
    );
}

struct GlobalArgs {
    state_path: String,
    verbose: u8,
    rest: Vec<String>,
}

fn parse_global_args(args: &[String]) -> Result<GlobalArgs> {
    let mut state_path = DEFAULT_STATE_PATH.to_string();
    let mut verbose = 0u8;
    let mut idx = 1usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--state" => {
                state_path = args
                    .get(idx + 1)
                    .cloned()
                    .ok_or_else(|| anyhow!("Missing value after --state"))?;
                idx += 2;
            }
            "--backend" => {
                let url = args
                    .get(idx + 1)
                    .ok_or_else(|| anyhow!("Missing value after --backend"))?;
                config::set_override(config::BACKEND_URL_ENV, url);
                idx += 2;
            }
            "-v" | "--verbose" => {
                verbose = verbose.saturating_add(1);
                idx += 1;
            }
            "-vv" => {
                verbose = verbose.saturating_add(2);
                idx += 1;
            }
            _ => break,
        }
    }
    Ok(GlobalArgs {
        state_path,
        verbose,
        rest: args[idx..].to_vec(),
    })
}

fn init_logging(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_writer(io::stderr)
        .init();
}

fn load_state(path: &str) -> Result<FormState> {
    if Path::new(path).exists() {
        FormState::load_from_path(path).with_context(|| format!("Could not load state '{path}'"))
    } else {
        Ok(FormState::default())
    }
}

fn save_state(store: &FormStore, path: &str) -> Result<()> {
    store
        .state()
        .save_to_path(path)
        .with_context(|| format!("Could not write state '{path}'"))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Could not serialize JSON output")?;
    println!("{text}");
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("{}", about::version_cli_text());
        return Ok(());
    }
    let global = parse_global_args(&args)?;
    init_logging(global.verbose);
    let Some(command) = global.rest.first().cloned() else {
        usage();
        bail!("Missing command");
    };
    let state_path = global.state_path.as_str();

    match command.as_str() {
        "init" => {
            let store = FormStore::default();
            save_state(&store, state_path)?;
            println!("Wrote default form state to '{state_path}'");
            Ok(())
        }
        "view" | "state" => print_json(&FormStore::new(load_state(state_path)?).view()),
        "request" => {
            let state = load_state(state_path)?;
            let request = build_request(&state)?;
            print_json(&request.to_params())
        }
        "backend-version" => {
            let backend = HttpBackend::from_config()?;
            let version = backend
                .backend_version()
                .with_context(|| format!("Search unavailable at {}", backend.url()))?;
            println!("{version}");
            Ok(())
        }
        "submit" => submit(state_path, &global.rest[1..]),
        "shell" => interactive_shell(state_path),
        _ => {
            let mut store = FormStore::new(load_state(state_path)?);
            let cmd = parse_shell_tokens(&global.rest).map_err(|e| anyhow!(e))?;
            let backend = if cmd.needs_backend() {
                Some(HttpBackend::from_config()?)
            } else {
                None
            };
            let out = execute_shell_command(
                &mut store,
                backend.as_ref().map(|b| b as &dyn Backend),
                &cmd,
            )
            .map_err(|e| anyhow!(e))?;
            if out.state_changed {
                save_state(&store, state_path)?;
            }
            print_json(&out.output)
        }
    }
}

fn submit(state_path: &str, args: &[String]) -> Result<()> {
    let mut copy_gen = false;
    let mut code: Option<CodeLanguage> = None;
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--copy-gen" => {
                copy_gen = true;
                idx += 1;
            }
            "--code" => {
                let lang = args
                    .get(idx + 1)
                    .ok_or_else(|| anyhow!("Missing value after --code"))?;
                code = Some(lang.parse()?);
                idx += 2;
            }
            other => bail!("Unknown argument '{other}' for submit"),
        }
    }

    let mut store = FormStore::new(load_state(state_path)?);
    let backend = Arc::new(HttpBackend::from_config()?);
    let session = SearchSession::new(backend.clone());
    let version = session
        .check_backend()
        .with_context(|| format!("Search unavailable at {}", backend.url()))?;
    info!(url = backend.url(), version = %version, "submitting search");
    let result = run_search(&session, &store)?;
    if let Some(lang) = code {
        println!("\n{}\n{}", lang.title(), code_snippet(lang, &result));
    }
    if copy_gen {
        store.dispatch(Action::CopyGeneratorFromResult(
            result.generating_vector.clone(),
        ))?;
        save_state(&store, state_path)?;
    }
    Ok(())
}

fn run_search(session: &SearchSession, store: &FormStore) -> Result<SearchResult> {
    let handle = session.start(store.state())?;
    eprintln!("{}", SearchStatus::Running.message());
    let result = match handle.wait() {
        SearchStatus::Success(result) => result,
        other => bail!("{}", other.message()),
    };
    eprintln!("Search successful.");
    println!("{}", ResultSummary(&result));
    Ok(result)
}

fn report_backend(session: &SearchSession, backend: &HttpBackend) {
    match session.check_backend() {
        Ok(version) => eprintln!("Lattice Builder backend {version} at {}", backend.url()),
        Err(e) => {
            warn!(url = backend.url(), "search disabled");
            eprintln!("Search unavailable at {}: {e}", backend.url());
        }
    }
}

fn interactive_shell(state_path: &str) -> Result<()> {
    let mut store = FormStore::new(load_state(state_path)?);
    let backend = Arc::new(HttpBackend::from_config()?);
    let session = SearchSession::new(backend.clone());
    report_backend(&session, &backend);
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    loop {
        write!(stdout, "latweb> ")?;
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match line {
            "quit" | "exit" => break,
            "submit" => {
                if let Err(e) = run_search(&session, &store) {
                    eprintln!("{e:#}");
                }
                continue;
            }
            "backend-version" => {
                report_backend(&session, &backend);
                continue;
            }
            _ => {}
        }
        let result = parse_shell_line(line).and_then(|cmd| {
            execute_shell_command(&mut store, Some(backend.as_ref() as &dyn Backend), &cmd)
        });
        match result {
            Ok(out) => {
                if out.state_changed {
                    save_state(&store, state_path)?;
                }
                println!("{}", serde_json::to_string_pretty(&out.output)?);
            }
            Err(e) => eprintln!("{e}"),
        }
    }
    Ok(())
}
