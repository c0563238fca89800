use core::str::FromStr;
use serde::{Deserialize, Serialize};

use stockforge_core::DomainError;

/// Kind of a stock movement.
///
/// A purchase adds to a product's stock, a sale removes from it. These are the
/// only two kinds; anything else is rejected at the boundary.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Purchase,
    Sale,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Purchase => "purchase",
            TransactionKind::Sale => "sale",
        }
    }
}

impl core::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(TransactionKind::Purchase),
            "sale" => Ok(TransactionKind::Sale),
            other => Err(DomainError::invalid_kind(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_kinds() {
        assert_eq!("purchase".parse::<TransactionKind>().unwrap(), TransactionKind::Purchase);
        assert_eq!("sale".parse::<TransactionKind>().unwrap(), TransactionKind::Sale);
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = "transfer".parse::<TransactionKind>().unwrap_err();
        match err {
            DomainError::InvalidKind(k) => assert_eq!(k, "transfer"),
            _ => panic!("expected InvalidKind error"),
        }
    }
}
