//! Line-oriented commands that drive a [`FormStore`].
//!
//! Weight positions and array indices are one-based here, as displayed.

use crate::{
    backend::Backend,
    construction::ConstructionMethod,
    figure::FigureKind,
    form_state::FormState,
    multilevel::{Combiner, NormalizationKind},
    query::build_request,
    store::{Action, FillTarget, FormStore},
    weights::{WeightArray, WeightKind},
};
use serde_json::{Value, json};

#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Help,
    View,
    Request,
    LoadState { path: String },
    SaveState { path: String },
    Edit(Action),
    Fill { target: FillTarget, expr: String },
}

#[derive(Debug, Clone)]
pub struct ShellRunResult {
    pub state_changed: bool,
    pub output: Value,
}

impl ShellCommand {
    pub fn is_state_mutating(&self) -> bool {
        matches!(
            self,
            Self::LoadState { .. } | Self::Edit(_) | Self::Fill { .. }
        )
    }

    pub fn needs_backend(&self) -> bool {
        matches!(self, Self::Fill { .. })
    }
}

pub fn shell_help_text() -> &'static str {
    "latweb form commands:\n\
help\n\
view\n\
request\n\
load-state PATH\n\
save-state PATH\n\
reset\n\
size N|BASE^EXP\n\
dimension N\n\
norm P|inf\n\
cu on|off\n\
figure P-alpha|R-alpha|spectral\n\
alpha VALUE\n\
weight-power VALUE|q\n\
add-weights product|order-dependent|POD|projection-dependent\n\
remove-weights POS\n\
weights POS order|coordinate V1,V2,...\n\
weight POS order|coordinate INDEX VALUE\n\
projection POS 'COORDS:WEIGHT; COORDS:WEIGHT'\n\
construction METHOD\n\
nrand N\n\
gen A1,A2,...\n\
gen-component INDEX VALUE\n\
embedded on|off\n\
normalization on|off|SL10|DPW08\n\
min-level N\n\
max-level N\n\
low-pass on|off\n\
low-pass-threshold VALUE\n\
combiner sum|max|level:max|level:K\n\
fill gen EXPR\n\
fill POS order|coordinate EXPR\n\
POS and INDEX are one-based"
}

fn token_error(command: &str) -> String {
    format!("Invalid '{command}' usage. Try: help")
}

fn split_values(input: &str) -> Vec<String> {
    input.split(',').map(|s| s.trim().to_string()).collect()
}

fn parse_switch(raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(format!("Expected 'on' or 'off', got '{other}'")),
    }
}

fn parse_one_based(raw: &str, what: &str) -> Result<usize, String> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(format!("Invalid {what} '{raw}', expected a positive integer")),
    }
}

fn parse_array(raw: &str) -> Result<WeightArray, String> {
    raw.parse::<WeightArray>().map_err(|e| e.to_string())
}

fn single(tokens: &[String], cmd: &str) -> Result<String, String> {
    if tokens.len() == 2 {
        Ok(tokens[1].clone())
    } else {
        Err(token_error(cmd))
    }
}

pub fn parse_shell_tokens(tokens: &[String]) -> Result<ShellCommand, String> {
    if tokens.is_empty() {
        return Err("Missing shell command".to_string());
    }
    let cmd = tokens[0].as_str();
    let edit = |action: Action| -> Result<ShellCommand, String> { Ok(ShellCommand::Edit(action)) };
    match cmd {
        "help" | "-h" | "--help" => Ok(ShellCommand::Help),
        "view" => {
            if tokens.len() == 1 {
                Ok(ShellCommand::View)
            } else {
                Err(token_error(cmd))
            }
        }
        "request" => {
            if tokens.len() == 1 {
                Ok(ShellCommand::Request)
            } else {
                Err(token_error(cmd))
            }
        }
        "reset" => edit(Action::Reset),
        "load-state" => Ok(ShellCommand::LoadState {
            path: single(tokens, cmd)?,
        }),
        "save-state" => Ok(ShellCommand::SaveState {
            path: single(tokens, cmd)?,
        }),
        "size" => edit(Action::SetSize(single(tokens, cmd)?)),
        "dimension" | "dim" => edit(Action::SetDimension(single(tokens, cmd)?)),
        "norm" | "norm-type" => edit(Action::SetNormType(single(tokens, cmd)?)),
        "cu" | "coord-uniform" => edit(Action::SetCoordUniform(parse_switch(&single(
            tokens, cmd,
        )?)?)),
        "figure" => edit(Action::SetFigure(
            single(tokens, cmd)?
                .parse::<FigureKind>()
                .map_err(|e| e.to_string())?,
        )),
        "alpha" => edit(Action::SetAlpha(single(tokens, cmd)?)),
        "weight-power" | "weights-power" => edit(Action::SetWeightPower(single(tokens, cmd)?)),
        "add-weights" => edit(Action::AddWeights(
            single(tokens, cmd)?
                .parse::<WeightKind>()
                .map_err(|e| e.to_string())?,
        )),
        "remove-weights" => edit(Action::RemoveWeights(parse_one_based(
            &single(tokens, cmd)?,
            "weight position",
        )?)),
        "weights" => {
            if tokens.len() != 4 {
                return Err(token_error(cmd));
            }
            edit(Action::SetWeightValues {
                position: parse_one_based(&tokens[1], "weight position")?,
                array: parse_array(&tokens[2])?,
                values: split_values(&tokens[3]),
            })
        }
        "weight" => {
            if tokens.len() != 5 {
                return Err(token_error(cmd));
            }
            edit(Action::SetWeightValue {
                position: parse_one_based(&tokens[1], "weight position")?,
                array: parse_array(&tokens[2])?,
                index: parse_one_based(&tokens[3], "index")?,
                raw: tokens[4].clone(),
            })
        }
        "projection" => {
            if tokens.len() < 2 {
                return Err(token_error(cmd));
            }
            let text = tokens[2..].join(" ").replace(';', "\n");
            edit(Action::SetProjectionText {
                position: parse_one_based(&tokens[1], "weight position")?,
                text,
            })
        }
        "construction" | "method" => edit(Action::SetConstruction(
            single(tokens, cmd)?
                .parse::<ConstructionMethod>()
                .map_err(|e| e.to_string())?,
        )),
        "nrand" | "random-samples" => edit(Action::SetRandomSamples(single(tokens, cmd)?)),
        "gen" | "generating-vector" => {
            edit(Action::SetGeneratingVector(split_values(&single(tokens, cmd)?)))
        }
        "gen-component" => {
            if tokens.len() != 3 {
                return Err(token_error(cmd));
            }
            edit(Action::SetGeneratorComponent {
                index: parse_one_based(&tokens[1], "index")?,
                raw: tokens[2].clone(),
            })
        }
        "embedded" => edit(Action::SetEmbedded(parse_switch(&single(tokens, cmd)?)?)),
        "normalization" => {
            let value = single(tokens, cmd)?;
            match parse_switch(&value) {
                Ok(on) => edit(Action::SetNormalizationActive(on)),
                Err(_) => edit(Action::SetNormalizationKind(
                    value
                        .parse::<NormalizationKind>()
                        .map_err(|e| e.to_string())?,
                )),
            }
        }
        "min-level" => edit(Action::SetMinLevel(single(tokens, cmd)?)),
        "max-level" => edit(Action::SetMaxLevel(single(tokens, cmd)?)),
        "low-pass" => edit(Action::SetLowPassActive(parse_switch(&single(tokens, cmd)?)?)),
        "low-pass-threshold" => edit(Action::SetLowPassThreshold(single(tokens, cmd)?)),
        "combiner" => edit(Action::SetCombiner(
            single(tokens, cmd)?
                .parse::<Combiner>()
                .map_err(|e| e.to_string())?,
        )),
        "fill" => {
            if tokens.len() >= 3 && tokens[1] == "gen" {
                return Ok(ShellCommand::Fill {
                    target: FillTarget::GeneratingVector,
                    expr: tokens[2..].join(" "),
                });
            }
            if tokens.len() < 4 {
                return Err(token_error(cmd));
            }
            Ok(ShellCommand::Fill {
                target: FillTarget::Weights {
                    position: parse_one_based(&tokens[1], "weight position")?,
                    array: parse_array(&tokens[2])?,
                },
                expr: tokens[3..].join(" "),
            })
        }
        other => Err(format!("Unknown shell command '{other}'. Try: help")),
    }
}

pub fn parse_shell_line(line: &str) -> Result<ShellCommand, String> {
    let tokens = split_shell_words(line)?;
    parse_shell_tokens(&tokens)
}

/// Splits a command line into words. Quotes group words, and a quoted empty
/// string is kept as an empty argument. A backslash escapes the next
/// character except inside single quotes.
pub fn split_shell_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut word: Option<String> = None;
    let mut quote: Option<char> = None;
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        match (quote, ch) {
            (Some(open), c) if c == open => quote = None,
            (Some('\''), c) => word.get_or_insert_with(String::new).push(c),
            (_, '\\') => {
                if let Some(escaped) = chars.next() {
                    word.get_or_insert_with(String::new).push(escaped);
                }
            }
            (None, '\'' | '"') => {
                quote = Some(ch);
                word.get_or_insert_with(String::new);
            }
            (None, c) if c.is_whitespace() => words.extend(word.take()),
            (_, c) => word.get_or_insert_with(String::new).push(c),
        }
    }

    if let Some(open) = quote {
        return Err(format!("Unterminated {open}-quoted string in shell command"));
    }
    words.extend(word);
    if words.is_empty() {
        return Err("Empty shell command".to_string());
    }
    Ok(words)
}

pub fn execute_shell_command(
    store: &mut FormStore,
    backend: Option<&dyn Backend>,
    command: &ShellCommand,
) -> Result<ShellRunResult, String> {
    let result = match command {
        ShellCommand::Help => ShellRunResult {
            state_changed: false,
            output: json!({ "help": shell_help_text() }),
        },
        ShellCommand::View => ShellRunResult {
            state_changed: false,
            output: serde_json::to_value(store.view())
                .map_err(|e| format!("Could not serialize form view: {e}"))?,
        },
        ShellCommand::Request => {
            let request = build_request(store.state()).map_err(|e| e.to_string())?;
            ShellRunResult {
                state_changed: false,
                output: json!({ "method": latweb_protocol::METHOD_LATBUILDER_EXEC, "params": request.to_params() }),
            }
        }
        ShellCommand::LoadState { path } => {
            let state = FormState::load_from_path(path)
                .map_err(|e| format!("Could not load form state '{path}': {e}"))?;
            *store = FormStore::new(state);
            ShellRunResult {
                state_changed: true,
                output: json!({ "message": format!("Loaded form state from '{path}'") }),
            }
        }
        ShellCommand::SaveState { path } => {
            store
                .state()
                .save_to_path(path)
                .map_err(|e| format!("Could not save form state '{path}': {e}"))?;
            ShellRunResult {
                state_changed: false,
                output: json!({ "message": format!("Saved form state to '{path}'") }),
            }
        }
        ShellCommand::Edit(action) => {
            store.dispatch(action.clone()).map_err(|e| e.to_string())?;
            let view = store.view();
            ShellRunResult {
                state_changed: true,
                output: json!({ "invalid_fields": view.invalid_fields, "submittable": view.submittable }),
            }
        }
        ShellCommand::Fill { target, expr } => {
            let backend = backend.ok_or_else(|| "No backend available for 'fill'".to_string())?;
            store
                .fill_from_expression(backend, *target, expr)
                .map_err(|e| e.to_string())?;
            ShellRunResult {
                state_changed: true,
                output: json!({ "message": format!("Filled values from '{expr}'") }),
            }
        }
    };
    Ok(result)
}
