//! Dynamic `$` variables
//!
//! Postman-compatible fake data generators. Every call produces a fresh value
//! and every value is a string, since substitution always produces text.

use chrono::{Duration, Utc};
use rand::Rng;
use uuid::Uuid;

/// Catalogue entry for one dynamic variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicInfo {
    /// Variable name, including the `$` prefix.
    pub name: &'static str,
    /// Human-readable description.
    pub description: &'static str,
    /// Example output.
    pub example: &'static str,
}

struct Generator {
    info: DynamicInfo,
    generate: fn() -> String,
}

const fn entry(
    name: &'static str,
    description: &'static str,
    example: &'static str,
    generate: fn() -> String,
) -> Generator {
    Generator {
        info: DynamicInfo {
            name,
            description,
            example,
        },
        generate,
    }
}

static GENERATORS: &[Generator] = &[
    entry("$guid", "Random UUID v4", "611c2e81-2ccb-42d8-9ddc-2d0bfa65c1b4", uuid_v4),
    entry("$uuid", "Random UUID v4", "611c2e81-2ccb-42d8-9ddc-2d0bfa65c1b4", uuid_v4),
    entry("$randomUUID", "Random UUID v4", "611c2e81-2ccb-42d8-9ddc-2d0bfa65c1b4", uuid_v4),
    entry("$timestamp", "Unix timestamp in seconds", "1706284800", timestamp),
    entry("$isoTimestamp", "ISO 8601 timestamp (UTC)", "2024-01-26T12:00:00.000Z", iso_timestamp),
    entry("$randomInt", "Random integer 1-1000", "427", random_int),
    entry("$randomString", "Random alphanumeric string (10 chars)", "aB3dE5fG7h", random_string),
    entry("$randomAlphaNumeric", "Random alphanumeric character", "k", random_alpha_numeric),
    entry("$randomEmail", "Random email address", "x7kq2mfa0d@example.com", random_email),
    entry("$randomPhoneNumber", "Random phone number", "+1-555-123-4567", random_phone),
    entry("$randomIP", "Random IPv4 address", "192.168.12.4", random_ipv4),
    entry("$randomIPV6", "Random IPv6 address", "2001:0db8:85a3:0000:0000:8a2e:0370:7334", random_ipv6),
    entry("$randomMACAddress", "Random MAC address", "3e:1f:8a:02:c4:9b", random_mac),
    entry("$randomHexColor", "Random hex color", "#a3c2f0", random_hex_color),
    entry("$randomPrice", "Random price", "42.99", random_price),
    entry("$randomCreditCard", "Random 16-digit card number", "4111111111111111", random_credit_card),
    entry("$randomBoolean", "Random boolean (true/false)", "true", random_boolean),
    entry("$randomFirstName", "Random first name", "Olivia", random_first_name),
    entry("$randomLastName", "Random last name", "Garcia", random_last_name),
    entry("$randomFullName", "Random full name", "Olivia Garcia", random_full_name),
    entry("$randomUserName", "Random user name", "olivia.garcia42", random_user_name),
    entry("$randomCity", "Random city", "Lisbon", random_city),
    entry("$randomCountry", "Random country", "Portugal", random_country),
    entry("$randomColor", "Random color name", "teal", random_color),
    entry("$randomWord", "Random word", "matrix", random_word),
    entry("$randomDomainName", "Random domain name", "bluefox.net", random_domain_name),
    entry("$randomUrl", "Random URL", "https://bluefox.net", random_url),
    entry("$randomBankAccount", "Random 8-digit bank account", "09184532", random_bank_account),
    entry("$randomDatePast", "Random date within the last year", "2024-03-02T08:15:00.000Z", random_date_past),
    entry("$randomDateFuture", "Random date within the next year", "2025-08-19T17:40:00.000Z", random_date_future),
];

const EMAIL_DOMAINS: &[&str] = &["example.com", "test.com", "demo.org", "sample.net"];

const FIRST_NAMES: &[&str] = &[
    "James", "Mary", "John", "Patricia", "Robert", "Jennifer", "Michael", "Linda", "David",
    "Sarah", "Emma", "Olivia", "Liam", "Noah", "Ava", "Lucas", "Mia", "Sofia",
];

const LAST_NAMES: &[&str] = &[
    "Smith", "Johnson", "Brown", "Jones", "Garcia", "Miller", "Davis", "Martinez", "Wilson",
    "Anderson", "Taylor", "Moore", "Lee", "Perez", "Silva", "Costa",
];

const CITIES: &[&str] = &[
    "Lisbon", "Porto", "Madrid", "Paris", "Berlin", "London", "Tokyo", "Toronto", "Austin",
    "Sydney", "Nairobi", "Lima",
];

const COUNTRIES: &[&str] = &[
    "Portugal", "Spain", "France", "Germany", "Japan", "Canada", "Brazil", "Australia", "Kenya",
    "Peru", "Norway", "India",
];

const COLORS: &[&str] = &[
    "red", "green", "blue", "teal", "orange", "purple", "yellow", "black", "white", "magenta",
];

const WORDS: &[&str] = &[
    "matrix", "signal", "harbor", "vector", "meadow", "socket", "lantern", "quartz", "ember",
    "orbit", "cobalt", "summit",
];

const TLDS: &[&str] = &["com", "net", "org", "io", "dev"];

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Stateless generator for `$`-prefixed variables.
///
/// Safe to call from concurrent script executions: name pools are constants
/// and each call draws from the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct DynamicVariables;

impl DynamicVariables {
    /// Generates a value, or `None` for an unknown name.
    #[must_use]
    pub fn generate(name: &str) -> Option<String> {
        GENERATORS
            .iter()
            .find(|g| g.info.name == name)
            .map(|g| (g.generate)())
    }

    /// Generates a value, echoing unknown names unchanged.
    #[must_use]
    pub fn resolve(name: &str) -> String {
        Self::generate(name).unwrap_or_else(|| name.to_string())
    }

    /// Returns whether the name is a known dynamic variable.
    #[must_use]
    pub fn is_dynamic(name: &str) -> bool {
        GENERATORS.iter().any(|g| g.info.name == name)
    }

    /// All known names, sorted.
    #[must_use]
    pub fn list_all() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = GENERATORS.iter().map(|g| g.info.name).collect();
        names.sort_unstable();
        names
    }

    /// Catalogue with descriptions and examples, in definition order.
    #[must_use]
    pub fn available() -> Vec<DynamicInfo> {
        GENERATORS.iter().map(|g| g.info).collect()
    }
}

fn pick(pool: &[&str]) -> String {
    let mut rng = rand::rng();
    pool[rng.random_range(0..pool.len())].to_string()
}

fn alphanumeric(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(ALPHANUMERIC[rng.random_range(0..ALPHANUMERIC.len())]))
        .collect()
}

fn digits(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

fn uuid_v4() -> String {
    Uuid::new_v4().to_string()
}

fn timestamp() -> String {
    Utc::now().timestamp().to_string()
}

fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

fn random_int() -> String {
    rand::rng().random_range(1..=1000).to_string()
}

fn random_string() -> String {
    alphanumeric(10)
}

fn random_alpha_numeric() -> String {
    alphanumeric(1)
}

fn random_email() -> String {
    format!("{}@{}", alphanumeric(10).to_lowercase(), pick(EMAIL_DOMAINS))
}

fn random_phone() -> String {
    let mut rng = rand::rng();
    format!(
        "+1-{}-{}-{}",
        rng.random_range(200..1000),
        rng.random_range(100..1000),
        rng.random_range(1000..10000)
    )
}

fn random_ipv4() -> String {
    let mut rng = rand::rng();
    format!(
        "{}.{}.{}.{}",
        rng.random_range(1..=255),
        rng.random_range(0..=255),
        rng.random_range(0..=255),
        rng.random_range(1..=254)
    )
}

fn random_ipv6() -> String {
    let mut rng = rand::rng();
    (0..8)
        .map(|_| format!("{:04x}", rng.random::<u16>()))
        .collect::<Vec<_>>()
        .join(":")
}

fn random_mac() -> String {
    let mut rng = rand::rng();
    (0..6)
        .map(|_| format!("{:02x}", rng.random::<u8>()))
        .collect::<Vec<_>>()
        .join(":")
}

fn random_hex_color() -> String {
    format!("#{:06x}", rand::rng().random_range(0..=0x00ff_ffff_u32))
}

fn random_price() -> String {
    let mut rng = rand::rng();
    format!("{}.{:02}", rng.random_range(1..1000), rng.random_range(0..100))
}

fn random_credit_card() -> String {
    let mut rng = rand::rng();
    let first = char::from(b'1' + rng.random_range(0..9u8));
    format!("{first}{}", digits(15))
}

fn random_boolean() -> String {
    rand::rng().random_bool(0.5).to_string()
}

fn random_first_name() -> String {
    pick(FIRST_NAMES)
}

fn random_last_name() -> String {
    pick(LAST_NAMES)
}

fn random_full_name() -> String {
    format!("{} {}", pick(FIRST_NAMES), pick(LAST_NAMES))
}

fn random_user_name() -> String {
    format!(
        "{}.{}{}",
        pick(FIRST_NAMES).to_lowercase(),
        pick(LAST_NAMES).to_lowercase(),
        rand::rng().random_range(1..100)
    )
}

fn random_city() -> String {
    pick(CITIES)
}

fn random_country() -> String {
    pick(COUNTRIES)
}

fn random_color() -> String {
    pick(COLORS)
}

fn random_word() -> String {
    pick(WORDS)
}

fn random_domain_name() -> String {
    format!("{}{}.{}", pick(WORDS), pick(COLORS), pick(TLDS))
}

fn random_url() -> String {
    format!("https://{}", random_domain_name())
}

fn random_bank_account() -> String {
    digits(8)
}

fn random_date_past() -> String {
    let offset = Duration::seconds(rand::rng().random_range(60..365 * 24 * 3600));
    (Utc::now() - offset)
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

fn random_date_future() -> String {
    let offset = Duration::seconds(rand::rng().random_range(60..365 * 24 * 3600));
    (Utc::now() + offset)
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_guid_aliases_are_uuids() {
        for name in ["$guid", "$uuid", "$randomUUID"] {
            let value = DynamicVariables::generate(name).expect("known name");
            assert!(Uuid::parse_str(&value).is_ok(), "{name} gave {value}");
        }
    }

    #[test]
    fn test_unknown_name_is_echoed() {
        assert_eq!(DynamicVariables::resolve("$nope"), "$nope");
        assert!(DynamicVariables::generate("$nope").is_none());
        assert!(!DynamicVariables::is_dynamic("plain"));
    }

    #[test]
    fn test_successive_guids_differ() {
        assert_ne!(
            DynamicVariables::resolve("$guid"),
            DynamicVariables::resolve("$guid")
        );
    }

    #[test]
    fn test_timestamp_is_unix_seconds() {
        let ts: i64 = DynamicVariables::resolve("$timestamp")
            .parse()
            .expect("integer");
        assert!((ts - Utc::now().timestamp()).abs() < 5);
    }

    #[test]
    fn test_iso_timestamp_shape() {
        let ts = DynamicVariables::resolve("$isoTimestamp");
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
        assert!(ts.ends_with('Z'));
    }

    #[test]
    fn test_random_int_range() {
        for _ in 0..50 {
            let n: u32 = DynamicVariables::resolve("$randomInt")
                .parse()
                .expect("integer");
            assert!((1..=1000).contains(&n));
        }
    }

    #[test]
    fn test_random_string_shapes() {
        let s = DynamicVariables::resolve("$randomString");
        assert_eq!(s.len(), 10);
        assert!(s.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(DynamicVariables::resolve("$randomAlphaNumeric").len(), 1);
        assert_eq!(DynamicVariables::resolve("$randomBankAccount").len(), 8);
    }

    #[test]
    fn test_random_email_uses_domain_pool() {
        let email = DynamicVariables::resolve("$randomEmail");
        let (_, domain) = email.split_once('@').expect("has @");
        assert!(EMAIL_DOMAINS.contains(&domain));
    }

    #[test]
    fn test_phone_number_format() {
        let phone = DynamicVariables::resolve("$randomPhoneNumber");
        let parts: Vec<&str> = phone.split('-').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "+1");
        assert_eq!(parts[1].len(), 3);
        assert_eq!(parts[2].len(), 3);
        assert_eq!(parts[3].len(), 4);
    }

    #[test]
    fn test_network_addresses() {
        let ip: std::net::Ipv4Addr = DynamicVariables::resolve("$randomIP")
            .parse()
            .expect("ipv4");
        assert!(!ip.is_unspecified());
        assert!(
            DynamicVariables::resolve("$randomIPV6")
                .parse::<std::net::Ipv6Addr>()
                .is_ok()
        );
        assert_eq!(DynamicVariables::resolve("$randomMACAddress").len(), 17);
    }

    #[test]
    fn test_price_and_card() {
        let price = DynamicVariables::resolve("$randomPrice");
        let (_, cents) = price.split_once('.').expect("decimal point");
        assert_eq!(cents.len(), 2);

        let card = DynamicVariables::resolve("$randomCreditCard");
        assert_eq!(card.len(), 16);
        assert!(card.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_boolean_is_string() {
        let b = DynamicVariables::resolve("$randomBoolean");
        assert!(b == "true" || b == "false");
    }

    #[test]
    fn test_hex_color() {
        let color = DynamicVariables::resolve("$randomHexColor");
        assert_eq!(color.len(), 7);
        assert!(color.starts_with('#'));
    }

    #[test]
    fn test_list_all_sorted_and_complete() {
        let names = DynamicVariables::list_all();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert_eq!(names.len(), DynamicVariables::available().len());
        assert!(names.contains(&"$guid"));
        assert!(names.contains(&"$randomCreditCard"));
    }

    #[test]
    fn test_every_catalogue_entry_generates() {
        for info in DynamicVariables::available() {
            let value = DynamicVariables::resolve(info.name);
            assert!(!value.is_empty());
            assert_ne!(value, info.name);
        }
    }
}
