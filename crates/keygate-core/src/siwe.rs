//! Sign-In with Ethereum statements (EIP-4361).
//!
//! Every wallet signature in the system is over one of these: the per-round
//! session statement, and the capacity delegation. Rendering is canonical so
//! that a verifier re-parsing `signedMessage` sees exactly what was signed.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{CoreError, Result};
use crate::recap::{Recap, RECAP_URN_PREFIX};
use crate::wallet::Address;

const HEADER_SUFFIX: &str = " wants you to sign in with your Ethereum account:";
const SIWE_VERSION: &str = "1";

/// A sign-in statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiweMessage {
    pub domain: String,
    pub address: Address,
    pub statement: Option<String>,
    pub uri: String,
    pub chain_id: u64,
    pub nonce: String,
    pub issued_at: DateTime<Utc>,
    pub expiration_time: Option<DateTime<Utc>>,
    pub resources: Vec<String>,
}

impl SiweMessage {
    /// A statement with no resources, issued now.
    pub fn new(
        domain: impl Into<String>,
        address: Address,
        uri: impl Into<String>,
        chain_id: u64,
        nonce: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            address,
            statement: None,
            uri: uri.into(),
            chain_id,
            nonce: nonce.into(),
            issued_at: truncate_millis(Utc::now()),
            expiration_time: None,
            resources: Vec::new(),
        }
    }

    pub fn with_statement(mut self, statement: impl Into<String>) -> Self {
        self.statement = Some(statement.into());
        self
    }

    pub fn with_issued_at(mut self, issued_at: DateTime<Utc>) -> Self {
        self.issued_at = truncate_millis(issued_at);
        self
    }

    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration_time = Some(truncate_millis(expiration));
        self
    }

    /// Embed a recap: its statement is appended and its URN becomes the last
    /// resource.
    pub fn with_recap(mut self, recap: &Recap) -> Result<Self> {
        let recap_statement = recap.statement();
        self.statement = Some(match self.statement.take() {
            Some(existing) if !existing.is_empty() => format!("{existing} {recap_statement}"),
            _ => recap_statement,
        });
        self.resources.push(recap.to_urn()?);
        Ok(self)
    }

    /// The embedded recap, if any. The last `urn:recap:` resource wins.
    pub fn recap(&self) -> Result<Option<Recap>> {
        self.resources
            .iter()
            .rev()
            .find(|r| r.starts_with(RECAP_URN_PREFIX))
            .map(|urn| Recap::from_urn(urn))
            .transpose()
    }

    /// Whether the statement has expired at `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration_time.map_or(false, |exp| exp <= now)
    }
}

fn truncate_millis(t: DateTime<Utc>) -> DateTime<Utc> {
    // Round-trips through the millisecond text form unchanged.
    let millis = t.timestamp_millis();
    DateTime::from_timestamp_millis(millis).unwrap_or(t)
}

fn format_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| CoreError::MalformedSiwe(format!("timestamp {s}: {e}")))
}

impl fmt::Display for SiweMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}{HEADER_SUFFIX}", self.domain)?;
        writeln!(f, "{}", self.address.to_checksum())?;
        writeln!(f)?;
        if let Some(statement) = &self.statement {
            writeln!(f, "{statement}")?;
            writeln!(f)?;
        }
        writeln!(f, "URI: {}", self.uri)?;
        writeln!(f, "Version: {SIWE_VERSION}")?;
        writeln!(f, "Chain ID: {}", self.chain_id)?;
        writeln!(f, "Nonce: {}", self.nonce)?;
        write!(f, "Issued At: {}", format_time(&self.issued_at))?;
        if let Some(exp) = &self.expiration_time {
            write!(f, "\nExpiration Time: {}", format_time(exp))?;
        }
        if !self.resources.is_empty() {
            write!(f, "\nResources:")?;
            for resource in &self.resources {
                write!(f, "\n- {resource}")?;
            }
        }
        Ok(())
    }
}

struct Lines<'a> {
    inner: std::iter::Peekable<std::str::Lines<'a>>,
}

impl<'a> Lines<'a> {
    fn next(&mut self, what: &str) -> Result<&'a str> {
        self.inner
            .next()
            .ok_or_else(|| CoreError::MalformedSiwe(format!("missing {what}")))
    }

    fn field(&mut self, tag: &str) -> Result<&'a str> {
        let line = self.next(tag)?;
        line.strip_prefix(tag)
            .and_then(|rest| rest.strip_prefix(": "))
            .ok_or_else(|| CoreError::MalformedSiwe(format!("expected {tag}, got {line:?}")))
    }

    fn optional_field(&mut self, tag: &str) -> Option<&'a str> {
        let prefix = format!("{tag}: ");
        let value = self.inner.peek()?.strip_prefix(prefix.as_str())?;
        self.inner.next();
        Some(value)
    }
}

impl FromStr for SiweMessage {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        let mut lines = Lines {
            inner: s.lines().peekable(),
        };

        let header = lines.next("header")?;
        let domain = header
            .strip_suffix(HEADER_SUFFIX)
            .ok_or_else(|| CoreError::MalformedSiwe("bad header".into()))?
            .to_string();
        let address: Address = lines.next("address")?.parse()?;

        if !lines.next("blank line")?.is_empty() {
            return Err(CoreError::MalformedSiwe("expected blank line after address".into()));
        }

        let has_statement = matches!(lines.inner.peek(), Some(line) if !line.starts_with("URI: "));
        let statement = if has_statement {
            let statement = lines.next("statement")?.to_string();
            if !lines.next("blank line")?.is_empty() {
                return Err(CoreError::MalformedSiwe(
                    "expected blank line after statement".into(),
                ));
            }
            Some(statement)
        } else {
            None
        };

        let uri = lines.field("URI")?.to_string();
        let version = lines.field("Version")?;
        if version != SIWE_VERSION {
            return Err(CoreError::MalformedSiwe(format!("unsupported version {version}")));
        }
        let chain_id = lines
            .field("Chain ID")?
            .parse()
            .map_err(|_| CoreError::MalformedSiwe("chain id".into()))?;
        let nonce = lines.field("Nonce")?.to_string();
        let issued_at = parse_time(lines.field("Issued At")?)?;
        let expiration_time = lines
            .optional_field("Expiration Time")
            .map(parse_time)
            .transpose()?;

        let mut resources = Vec::new();
        if let Some(line) = lines.inner.next() {
            if line != "Resources:" {
                return Err(CoreError::MalformedSiwe(format!("unexpected line {line:?}")));
            }
            for line in lines.inner.by_ref() {
                let resource = line
                    .strip_prefix("- ")
                    .ok_or_else(|| CoreError::MalformedSiwe(format!("bad resource {line:?}")))?;
                resources.push(resource.to_string());
            }
        }

        Ok(Self {
            domain,
            address,
            statement,
            uri,
            chain_id,
            nonce,
            issued_at,
            expiration_time,
            resources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Ability, Resource};
    use chrono::TimeZone;

    fn sample() -> SiweMessage {
        let address: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap();
        SiweMessage::new(
            "localhost",
            address,
            "lit:session:abcd",
            42161,
            "0x1111111111111111111111111111111111111111111111111111111111111111",
        )
        .with_issued_at(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        .with_expiration(Utc.with_ymd_and_hms(2024, 1, 1, 0, 10, 0).unwrap())
    }

    #[test]
    fn test_render_without_statement() {
        let text = sample().to_string();
        let expected = "localhost wants you to sign in with your Ethereum account:\n\
             0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266\n\
             \n\
             URI: lit:session:abcd\n\
             Version: 1\n\
             Chain ID: 42161\n\
             Nonce: 0x1111111111111111111111111111111111111111111111111111111111111111\n\
             Issued At: 2024-01-01T00:00:00.000Z\n\
             Expiration Time: 2024-01-01T00:10:00.000Z";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_parse_roundtrip_with_recap() {
        let recap = Recap::new().with_attenuation(
            &Resource::all_access_control_conditions(),
            Ability::AccessControlConditionDecryption,
        );
        let message = sample().with_recap(&recap).unwrap();
        let parsed: SiweMessage = message.to_string().parse().unwrap();

        assert_eq!(parsed, message);
        assert_eq!(parsed.recap().unwrap(), Some(recap));
        assert!(parsed
            .statement
            .unwrap()
            .starts_with("I further authorize the stated URI"));
    }

    #[test]
    fn test_recap_appends_to_existing_statement() {
        let recap = Recap::new().with_attenuation(
            &Resource::rate_limit_increase("1"),
            Ability::RateLimitIncreaseAuth,
        );
        let message = sample().with_statement("Hello.").with_recap(&recap).unwrap();
        assert!(message.statement.unwrap().starts_with("Hello. I further authorize"));
    }

    #[test]
    fn test_expiry() {
        let message = sample();
        let before = Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 1, 1, 0, 10, 0).unwrap();
        assert!(!message.is_expired_at(before));
        assert!(message.is_expired_at(after));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!("".parse::<SiweMessage>().is_err());
        assert!("example.com wants you\n0x00".parse::<SiweMessage>().is_err());

        let text = sample().to_string().replace("Version: 1", "Version: 2");
        assert!(text.parse::<SiweMessage>().is_err());
    }
}
