use std::fmt;

/// One line of the injector wire grammar. `Display` renders the exact text
/// written to the device (terminator excluded; the link appends CRLF).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InjectorCommand {
    /// Relative pointer motion in pixels.
    Move { dx: i32, dy: i32 },
    /// Press-and-release of the primary button at the current position.
    Click,
    /// Wheel scroll; sign selects the direction.
    Scroll { units: i32 },
    /// Emit a single character.
    Type { ch: char },
    /// Emit a named key such as `Backspace`.
    Key { name: String },
    /// Modifier chord such as `ctrl+a`.
    Combo { chord: String },
    /// A line forwarded verbatim.
    Raw(String),
}

impl InjectorCommand {
    pub fn key(name: impl Into<String>) -> Self {
        Self::Key { name: name.into() }
    }

    pub fn combo(chord: impl Into<String>) -> Self {
        Self::Combo {
            chord: chord.into(),
        }
    }

    /// Best-effort parse of a raw line back into the grammar. Unknown lines
    /// stay `Raw` so pass-through commands keep flowing, but known forms are
    /// recognized so the link can enforce the Enter block on them.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (head, rest) = match line.split_once(',') {
            Some((head, rest)) => (head, Some(rest)),
            None => (line, None),
        };
        match (head, rest) {
            ("MOVE", Some(rest)) => {
                if let Some((dx, dy)) = rest.split_once(',') {
                    if let (Ok(dx), Ok(dy)) = (dx.trim().parse(), dy.trim().parse()) {
                        return Self::Move { dx, dy };
                    }
                }
                Self::Raw(line.to_string())
            }
            ("CLICK", None) => Self::Click,
            ("SCROLL", Some(rest)) => match rest.trim().parse() {
                Ok(units) => Self::Scroll { units },
                Err(_) => Self::Raw(line.to_string()),
            },
            ("TYPE", Some(rest)) => {
                let mut chars = rest.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Self::Type { ch },
                    _ => Self::Raw(line.to_string()),
                }
            }
            ("KEY", Some(rest)) => Self::Key {
                name: rest.to_string(),
            },
            ("COMBO", Some(rest)) => Self::Combo {
                chord: rest.to_string(),
            },
            _ => Self::Raw(line.to_string()),
        }
    }

    /// `KEY,Enter` is refused host-side: a stray Enter at the OS level can
    /// trigger keyboard shortcuts far outside the form.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Key { name } if name.eq_ignore_ascii_case("enter"))
    }
}

impl fmt::Display for InjectorCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Move { dx, dy } => write!(f, "MOVE,{dx},{dy}"),
            Self::Click => write!(f, "CLICK"),
            Self::Scroll { units } => write!(f, "SCROLL,{units}"),
            Self::Type { ch } => write!(f, "TYPE,{ch}"),
            Self::Key { name } => write!(f, "KEY,{name}"),
            Self::Combo { chord } => write!(f, "COMBO,{chord}"),
            Self::Raw(line) => write!(f, "{line}"),
        }
    }
}
