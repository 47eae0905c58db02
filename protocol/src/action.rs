use thiserror::Error;

/// A high-level directive from an `/automation` command list. Parsed from the
/// comma-delimited wire strings at the boundary; the engine only ever sees
/// this enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Fill an input or textarea and verify the resulting value.
    FillField { selector: String, text: String },
    /// Click an element and verify the change where one is observable.
    ClickSelector { selector: String },
    /// Click the option inside a container whose label matches the text.
    ClickOption { container: String, label: String },
    /// Local pause; nothing is transmitted.
    Delay { ms: u64 },
    /// Anything else is forwarded to the injector verbatim.
    Raw(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionParseError {
    #[error("{command} requires {expected}")]
    MissingArgument {
        command: &'static str,
        expected: &'static str,
    },
    #[error("DELAY wants a millisecond count, got {0:?}")]
    InvalidDelay(String),
}

impl Action {
    pub fn parse(line: &str) -> Result<Self, ActionParseError> {
        let line = line.trim();
        let (head, rest) = match line.split_once(',') {
            Some((head, rest)) => (head, Some(rest)),
            None => (line, None),
        };
        match head {
            "FILL_FIELD" => {
                // Text keeps any embedded commas; only the selector is split off.
                let (selector, text) = rest
                    .and_then(|rest| rest.split_once(','))
                    .ok_or(ActionParseError::MissingArgument {
                        command: "FILL_FIELD",
                        expected: "a selector and text",
                    })?;
                if selector.is_empty() {
                    return Err(ActionParseError::MissingArgument {
                        command: "FILL_FIELD",
                        expected: "a selector and text",
                    });
                }
                Ok(Self::FillField {
                    selector: selector.to_string(),
                    text: text.to_string(),
                })
            }
            "CLICK_SELECTOR" => match rest {
                Some(selector) if !selector.is_empty() => Ok(Self::ClickSelector {
                    selector: selector.to_string(),
                }),
                _ => Err(ActionParseError::MissingArgument {
                    command: "CLICK_SELECTOR",
                    expected: "a selector",
                }),
            },
            "CLICK_OPTION" => {
                let (container, label) = rest
                    .and_then(|rest| rest.split_once(','))
                    .ok_or(ActionParseError::MissingArgument {
                        command: "CLICK_OPTION",
                        expected: "a container selector and a label",
                    })?;
                if container.is_empty() || label.is_empty() {
                    return Err(ActionParseError::MissingArgument {
                        command: "CLICK_OPTION",
                        expected: "a container selector and a label",
                    });
                }
                Ok(Self::ClickOption {
                    container: container.to_string(),
                    label: label.to_string(),
                })
            }
            "DELAY" => {
                let raw = rest.unwrap_or_default();
                raw.trim()
                    .parse::<u64>()
                    .map(|ms| Self::Delay { ms })
                    .map_err(|_| ActionParseError::InvalidDelay(raw.to_string()))
            }
            _ => Ok(Self::Raw(line.to_string())),
        }
    }
}
