use std::{fmt::Display, str::FromStr};

use anyhow::{anyhow, bail};

pub const COMMAND: char = '⌘';
pub const SHIFT: char = '⇧';
pub const OPTION: char = '⌥';
pub const CONTROL: char = '⌃';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    pub command: bool,
    pub shift: bool,
    pub option: bool,
    pub control: bool,
}

/// A global shortcut: any set of modifiers plus one letter or digit. Written either with the
/// modifier symbols (`⌘⇧O`) or spelled out (`cmd+shift+o`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyCombination {
    pub modifiers: Modifiers,
    /// Uppercase ASCII letter or digit.
    pub key: char,
}

impl FromStr for KeyCombination {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains('+') {
            return parse_spelled(s);
        }

        let mut chars = s.chars();
        let key = chars
            .next_back()
            .ok_or_else(|| anyhow!("Empty key combination"))?;
        let mut modifiers = Modifiers::default();
        for symbol in chars {
            match symbol {
                COMMAND => modifiers.command = true,
                SHIFT => modifiers.shift = true,
                OPTION => modifiers.option = true,
                CONTROL => modifiers.control = true,
                other => bail!("Unknown modifier {other:?} in {s:?}"),
            }
        }
        Ok(Self {
            modifiers,
            key: parse_key(key, s)?,
        })
    }
}

fn parse_spelled(s: &str) -> anyhow::Result<KeyCombination> {
    let mut parts = s.split('+').map(str::trim);
    let key = parts
        .next_back()
        .ok_or_else(|| anyhow!("Empty key combination"))?;
    let mut modifiers = Modifiers::default();
    for part in parts {
        match part.to_ascii_lowercase().as_str() {
            "cmd" | "command" | "super" => modifiers.command = true,
            "shift" => modifiers.shift = true,
            "alt" | "opt" | "option" => modifiers.option = true,
            "ctrl" | "control" => modifiers.control = true,
            other => bail!("Unknown modifier {other:?} in {s:?}"),
        }
    }

    let mut chars = key.chars();
    let (Some(key), None) = (chars.next(), chars.next()) else {
        bail!("Expected a single key character at the end of {s:?}");
    };
    Ok(KeyCombination {
        modifiers,
        key: parse_key(key, s)?,
    })
}

fn parse_key(key: char, combination: &str) -> anyhow::Result<char> {
    let key = key.to_ascii_uppercase();
    if !key.is_ascii_uppercase() && !key.is_ascii_digit() {
        bail!("Unsupported key {key:?} in {combination:?}");
    }
    Ok(key)
}

impl Display for KeyCombination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Modifiers {
            command,
            shift,
            option,
            control,
        } = self.modifiers;
        for (enabled, symbol) in [
            (command, COMMAND),
            (shift, SHIFT),
            (option, OPTION),
            (control, CONTROL),
        ] {
            if enabled {
                write!(f, "{symbol}")?;
            }
        }
        write!(f, "{}", self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyCombination, Modifiers};

    #[test]
    fn test_symbols() {
        let combination: KeyCombination = "⌘⇧O".parse().unwrap();
        assert_eq!(
            combination,
            KeyCombination {
                modifiers: Modifiers {
                    command: true,
                    shift: true,
                    ..Default::default()
                },
                key: 'O'
            }
        );
    }

    #[test]
    fn test_key_only_and_lowercase() {
        let combination: KeyCombination = "⌃7".parse().unwrap();
        assert!(combination.modifiers.control);
        assert_eq!(combination.key, '7');

        let combination: KeyCombination = "⌥p".parse().unwrap();
        assert_eq!(combination.key, 'P');

        let combination: KeyCombination = "x".parse().unwrap();
        assert_eq!(combination.modifiers, Modifiers::default());
    }

    #[test]
    fn test_spelled_out() {
        let spelled: KeyCombination = "cmd + Shift + o".parse().unwrap();
        let symbols: KeyCombination = "⌘⇧O".parse().unwrap();
        assert_eq!(spelled, symbols);

        let combination: KeyCombination = "ctrl+alt+1".parse().unwrap();
        assert_eq!(combination.to_string(), "⌥⌃1");
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!("".parse::<KeyCombination>().is_err());
        assert!("⌘⇧".parse::<KeyCombination>().is_err());
        assert!("⌘/".parse::<KeyCombination>().is_err());
        assert!("⌘é".parse::<KeyCombination>().is_err());
        assert!("A⌘B".parse::<KeyCombination>().is_err());
        assert!("hyper+k".parse::<KeyCombination>().is_err());
        assert!("cmd+ok".parse::<KeyCombination>().is_err());
    }

    #[test]
    fn test_display_is_canonical() {
        let combination: KeyCombination = "⌃⇧⌘a".parse().unwrap();
        assert_eq!(combination.to_string(), "⌘⇧⌃A");
        assert_eq!(
            combination.to_string().parse::<KeyCombination>().unwrap(),
            combination
        );
    }
}
