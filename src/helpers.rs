//! Utility functions for environment parsing and keypair handling.

use anyhow::{Context, anyhow};
use solana_sdk::signature::Keypair;

/// Parses a secret key into a Solana `Keypair`.
///
/// Two encodings are accepted: a JSON style byte array
/// (`"[150, 12, 123, ...]"`, as written by `solana-keygen`) and a base58
/// string (as exported by browser wallets).
///
/// # Examples
///
/// ```
/// use raydium_v4_swap::helpers::parse_keypair;
/// use solana_sdk::signature::Keypair;
///
/// let kp = Keypair::new();
/// let parsed = parse_keypair(&kp.to_base58_string()).unwrap();
/// assert_eq!(parsed.to_bytes(), kp.to_bytes());
/// ```
pub fn parse_keypair(secret: &str) -> anyhow::Result<Keypair> {
    let secret = secret.trim();
    let bytes = if secret.starts_with('[') {
        from_byte_array(secret)?
    } else {
        bs58::decode(secret)
            .into_vec()
            .context("Error decoding base58 keypair")?
    };
    Keypair::try_from(bytes.as_slice())
        .map_err(|e| anyhow!("Error converting bytes to Keypair: {e}"))
}

fn from_byte_array(secret: &str) -> anyhow::Result<Vec<u8>> {
    secret
        .trim_matches(&['[', ']'][..])
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<u8>()
                .with_context(|| format!("Error converting {s:?} to a byte"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signer::Signer;

    #[test]
    fn parses_byte_array() {
        let kp = Keypair::new();
        let array = format!(
            "[{}]",
            kp.to_bytes()
                .iter()
                .map(u8::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
        assert_eq!(parse_keypair(&array).unwrap().pubkey(), kp.pubkey());
    }

    #[test]
    fn parses_base58() {
        let kp = Keypair::new();
        let parsed = parse_keypair(&format!(" {}\n", kp.to_base58_string())).unwrap();
        assert_eq!(parsed.pubkey(), kp.pubkey());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_keypair("[1, 2, 300]").is_err());
        assert!(parse_keypair("[1, 2, 3]").is_err());
        assert!(parse_keypair("0OIl").is_err());
    }
}
