use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The signal used to ask the dependent process to stop.
///
/// Accepts names with or without the `SIG` prefix, in any case (`term`, `SIGINT`). On platforms
/// without signals the process is killed instead.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct StopSignal {
    name: String,
    #[cfg(unix)]
    signal: nix::sys::signal::Signal,
}

impl StopSignal {
    #[cfg(unix)]
    pub fn as_nix(&self) -> nix::sys::signal::Signal {
        self.signal
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self {
            name: "SIGTERM".to_string(),
            #[cfg(unix)]
            signal: nix::sys::signal::Signal::SIGTERM,
        }
    }
}

impl FromStr for StopSignal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let name = match upper.starts_with("SIG") {
            true => upper,
            false => format!("SIG{upper}"),
        };

        #[cfg(unix)]
        let signal = nix::sys::signal::Signal::from_str(&name)
            .map_err(|_| anyhow::anyhow!("unknown signal '{s}'"))?;

        Ok(Self {
            name,
            #[cfg(unix)]
            signal,
        })
    }
}

impl TryFrom<String> for StopSignal {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Display for StopSignal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("SIGTERM", "SIGTERM")]
    #[case("term", "SIGTERM")]
    #[case(" sigint ", "SIGINT")]
    #[case("HUP", "SIGHUP")]
    fn parse(#[case] input: &str, #[case] expected: &str) {
        let signal: StopSignal = input.parse().expect("must parse");
        assert_eq!(signal.to_string(), expected);
    }

    #[cfg(unix)]
    #[test]
    fn unknown() {
        assert!("SIGNOPE".parse::<StopSignal>().is_err());
    }

    #[test]
    fn default_is_term() {
        assert_eq!(StopSignal::default().to_string(), "SIGTERM");
    }
}
