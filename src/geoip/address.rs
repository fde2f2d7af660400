//! Caller-supplied IP addresses.
//!
//! Lookups accept either text (`"8.8.8.8"`, `"2001:db8::1"`) or the integer
//! form of an address. Integers up to `u32::MAX` are IPv4, larger ones IPv6.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error_handling::{GeoError, GeoResult};

/// An address as given to a lookup, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpInput {
    Text(String),
    Integer(u128),
    Addr(IpAddr),
}

impl IpInput {
    /// Parses the input into a canonical `IpAddr`.
    ///
    /// # Errors
    ///
    /// `GeoError::Query` if the text is not an IPv4 or IPv6 address.
    pub fn normalize(&self) -> GeoResult<IpAddr> {
        match self {
            IpInput::Text(text) => text
                .parse::<IpAddr>()
                .map_err(|_| GeoError::query(text, "not a valid IPv4 or IPv6 address")),
            IpInput::Integer(value) => Ok(match u32::try_from(*value) {
                Ok(v4) => IpAddr::V4(Ipv4Addr::from(v4)),
                Err(_) => IpAddr::V6(Ipv6Addr::from(*value)),
            }),
            IpInput::Addr(addr) => Ok(*addr),
        }
    }
}

impl fmt::Display for IpInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpInput::Text(text) => f.write_str(text),
            IpInput::Integer(value) => write!(f, "{}", value),
            IpInput::Addr(addr) => write!(f, "{}", addr),
        }
    }
}

impl From<&str> for IpInput {
    fn from(value: &str) -> Self {
        IpInput::Text(value.to_string())
    }
}

impl From<String> for IpInput {
    fn from(value: String) -> Self {
        IpInput::Text(value)
    }
}

impl From<&String> for IpInput {
    fn from(value: &String) -> Self {
        IpInput::Text(value.clone())
    }
}

impl From<u32> for IpInput {
    fn from(value: u32) -> Self {
        IpInput::Integer(u128::from(value))
    }
}

impl From<u64> for IpInput {
    fn from(value: u64) -> Self {
        IpInput::Integer(u128::from(value))
    }
}

impl From<u128> for IpInput {
    fn from(value: u128) -> Self {
        IpInput::Integer(value)
    }
}

impl From<IpAddr> for IpInput {
    fn from(value: IpAddr) -> Self {
        IpInput::Addr(value)
    }
}

impl From<Ipv4Addr> for IpInput {
    fn from(value: Ipv4Addr) -> Self {
        IpInput::Addr(IpAddr::V4(value))
    }
}

impl From<Ipv6Addr> for IpInput {
    fn from(value: Ipv6Addr) -> Self {
        IpInput::Addr(IpAddr::V6(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_integer_forms_agree() {
        let text = IpInput::from("8.8.8.8").normalize().unwrap();
        let integer = IpInput::from(134_744_072u32).normalize().unwrap();
        assert_eq!(text, integer);
        assert_eq!(integer.to_string(), "8.8.8.8");
    }

    #[test]
    fn test_integer_boundaries() {
        assert_eq!(
            IpInput::from(0u32).normalize().unwrap().to_string(),
            "0.0.0.0"
        );
        assert_eq!(
            IpInput::from(u64::from(u32::MAX)).normalize().unwrap().to_string(),
            "255.255.255.255"
        );
        // One past the IPv4 range is IPv6
        let v6 = IpInput::from(u64::from(u32::MAX) + 1).normalize().unwrap();
        assert!(v6.is_ipv6());
        assert_eq!(v6.to_string(), "::1:0:0");
    }

    #[test]
    fn test_ipv6_text_is_canonicalized() {
        let addr = IpInput::from("2001:0db8:85a3:0000:0000:8a2e:0370:7334")
            .normalize()
            .unwrap();
        assert_eq!(addr.to_string(), "2001:db8:85a3::8a2e:370:7334");
    }

    #[test]
    fn test_invalid_text_is_query_error() {
        for bad in ["not.an.ip.address", "", "256.1.1.1", " 8.8.8.8"] {
            let err = IpInput::from(bad).normalize().unwrap_err();
            assert!(err.is_query(), "{:?} should be rejected", bad);
        }
    }

    #[test]
    fn test_addr_passthrough() {
        let addr = Ipv4Addr::new(1, 1, 1, 1);
        assert_eq!(
            IpInput::from(addr).normalize().unwrap(),
            IpAddr::V4(addr)
        );
    }

    #[test]
    fn test_display_preserves_input() {
        assert_eq!(IpInput::from("8.8.8.8").to_string(), "8.8.8.8");
        assert_eq!(IpInput::from(134_744_072u32).to_string(), "134744072");
    }
}
