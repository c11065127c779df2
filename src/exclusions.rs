//! Addresses whose balances never count towards circulating supply.

use std::collections::HashSet;

use tracing::warn;

use crate::ledger::{Address, AddressParseError};

const DISTRIBUTION_ADDRESS: &str = "0x9BC4a93883C522D3C79c81c2999Aab52E2268d03";
const PRIVATE_OFFERING_ADDRESS: &str = "0x3cFE51b61E25750ab1426b0072e5D0cc5C30aAfA";
const ADVISORS_REWARD_ADDRESS: &str = "0x0218B706898d234b85d2494DF21eB0677EaEa918";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ExclusionKind {
    Distribution,
    PrivateOffering,
    AdvisorsReward,
    Burn,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExcludedAddress {
    pub kind: ExclusionKind,
    pub address: Address,
}

/// Splits a comma separated list of addresses. Whitespace around entries and empty entries are
/// ignored.
pub fn parse_burn_addresses(list: &str) -> Result<Vec<Address>, AddressParseError> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::parse::<Address>)
        .collect()
}

/// The escrow holders come first, then the burn addresses in configured order. The zero address
/// is always a member, and no address is a member twice.
#[derive(Clone, Debug)]
pub struct ExclusionSet {
    entries: Vec<ExcludedAddress>,
}

impl ExclusionSet {
    pub fn new(
        burn_addresses: impl IntoIterator<Item = Address>,
    ) -> Result<Self, AddressParseError> {
        let escrow = [
            (ExclusionKind::Distribution, DISTRIBUTION_ADDRESS),
            (ExclusionKind::PrivateOffering, PRIVATE_OFFERING_ADDRESS),
            (ExclusionKind::AdvisorsReward, ADVISORS_REWARD_ADDRESS),
        ];

        let mut entries = Vec::with_capacity(escrow.len() + 1);
        let mut seen = HashSet::new();

        for (kind, address) in escrow {
            let address = address.parse::<Address>()?;
            seen.insert(address.clone());
            entries.push(ExcludedAddress { kind, address });
        }

        let burn_addresses = burn_addresses
            .into_iter()
            .chain(std::iter::once(Address::zero()));

        for address in burn_addresses {
            if seen.insert(address.clone()) {
                entries.push(ExcludedAddress {
                    kind: ExclusionKind::Burn,
                    address,
                });
            } else if !address.is_zero() {
                warn!(%address, "address listed more than once in exclusion set, counting it once");
            }
        }

        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[ExcludedAddress] {
        &self.entries
    }

    pub fn all_addresses(&self) -> impl Iterator<Item = &Address> {
        self.entries.iter().map(|entry| &entry.address)
    }

    pub fn burn_addresses(&self) -> impl Iterator<Item = &Address> {
        self.entries
            .iter()
            .filter(|entry| entry.kind == ExclusionKind::Burn)
            .map(|entry| &entry.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::ZERO_ADDRESS as ZERO;

    const BURN_A: &str = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const BURN_B: &str = "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

    fn burn_strs(set: &ExclusionSet) -> Vec<&str> {
        set.burn_addresses().map(Address::as_str).collect()
    }

    #[test]
    fn parse_burn_addresses_test() {
        let addresses = parse_burn_addresses(&format!(" {BURN_A} ,{BURN_B},")).unwrap();
        assert_eq!(
            addresses,
            vec![BURN_A.parse().unwrap(), BURN_B.parse().unwrap()]
        );
    }

    #[test]
    fn parse_burn_addresses_rejects_malformed_test() {
        let error = parse_burn_addresses(&format!("{BURN_A},0xAAA")).unwrap_err();
        assert_eq!(error.input, "0xAAA");
    }

    #[test]
    fn parse_empty_burn_addresses_test() {
        assert!(parse_burn_addresses("").unwrap().is_empty());
    }

    #[test]
    fn escrow_addresses_come_first_test() {
        let set = ExclusionSet::new(vec![]).unwrap();
        let kinds: Vec<ExclusionKind> = set.entries().iter().map(|entry| entry.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ExclusionKind::Distribution,
                ExclusionKind::PrivateOffering,
                ExclusionKind::AdvisorsReward,
                ExclusionKind::Burn,
            ]
        );
        assert_eq!(
            set.all_addresses().next().unwrap().as_str(),
            "0x9bc4a93883c522d3c79c81c2999aab52e2268d03"
        );
    }

    #[test]
    fn zero_address_appended_when_missing_test() {
        let set = ExclusionSet::new(parse_burn_addresses(BURN_A).unwrap()).unwrap();
        assert_eq!(burn_strs(&set), vec![BURN_A, ZERO]);
    }

    #[test]
    fn zero_address_counted_once_test() {
        let configured = parse_burn_addresses(&format!("{ZERO},{BURN_A}")).unwrap();
        let set = ExclusionSet::new(configured).unwrap();
        assert_eq!(burn_strs(&set), vec![ZERO, BURN_A]);
    }

    #[test]
    fn duplicates_dropped_test() {
        let configured = parse_burn_addresses(&format!(
            "{BURN_A},{},{DISTRIBUTION_ADDRESS}",
            BURN_A.to_uppercase().replacen("0X", "0x", 1)
        ))
        .unwrap();
        let set = ExclusionSet::new(configured).unwrap();
        assert_eq!(burn_strs(&set), vec![BURN_A, ZERO]);
        assert_eq!(set.all_addresses().count(), 5);
    }
}
