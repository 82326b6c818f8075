//! Multi-asset value algebra.
//!
//! `MultiAsset` is a nested mapping `PolicyId -> (AssetName -> Quantity)`.
//! The canonical form prunes every zero-quantity entry and every policy
//! whose inner map would otherwise be empty; every operation here
//! re-normalizes to canonical form before returning.

use std::collections::BTreeMap;
use std::ops::Neg;

pub type PolicyId = [u8; 28];
pub type AssetName = Vec<u8>;
pub type Quantity = i128;

use crate::numeric::Coin;

/// A normalized multi-asset bundle. Construction always goes through
/// [`MultiAsset::normalize`] so an instance in the wild is always canonical.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiAsset(BTreeMap<PolicyId, BTreeMap<AssetName, Quantity>>);

impl MultiAsset {
    pub fn empty() -> Self {
        MultiAsset(BTreeMap::new())
    }

    pub fn from_map(raw: BTreeMap<PolicyId, BTreeMap<AssetName, Quantity>>) -> Self {
        let mut m = MultiAsset(raw);
        m.normalize();
        m
    }

    fn normalize(&mut self) {
        self.0.retain(|_, inner| {
            inner.retain(|_, qty| *qty != 0);
            !inner.is_empty()
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, policy: &PolicyId, asset: &[u8]) -> Quantity {
        self.0
            .get(policy)
            .and_then(|inner| inner.get(asset))
            .copied()
            .unwrap_or(0)
    }

    pub fn policies(&self) -> impl Iterator<Item = &PolicyId> {
        self.0.keys()
    }

    pub fn assets_of(&self, policy: &PolicyId) -> impl Iterator<Item = (&AssetName, &Quantity)> {
        self.0.get(policy).into_iter().flat_map(|m| m.iter())
    }

    /// Every policy/asset pair present in either operand, zero where absent.
    fn all_keys<'a>(a: &'a MultiAsset, b: &'a MultiAsset) -> impl Iterator<Item = (&'a PolicyId, &'a AssetName)> {
        a.0.iter()
            .flat_map(|(p, inner)| inner.keys().map(move |n| (p, n)))
            .chain(b.0.iter().flat_map(|(p, inner)| inner.keys().map(move |n| (p, n))))
    }

    /// True iff every quantity in `self` is strictly positive.
    pub fn all_positive(&self) -> bool {
        self.0.values().all(|inner| inner.values().all(|q| *q > 0))
    }

    pub fn negate(&self) -> MultiAsset {
        let mut out = BTreeMap::new();
        for (policy, inner) in &self.0 {
            let mut n = BTreeMap::new();
            for (asset, qty) in inner {
                n.insert(asset.clone(), -qty);
            }
            out.insert(*policy, n);
        }
        MultiAsset::from_map(out)
    }

    /// Split mint quantities: positive (minted) on one side, burned
    /// (negative, re-signed positive) on the other.
    pub fn split_mint(&self) -> (MultiAsset, MultiAsset) {
        let mut minted = BTreeMap::new();
        let mut burned = BTreeMap::new();
        for (policy, inner) in &self.0 {
            for (asset, qty) in inner {
                if *qty > 0 {
                    minted
                        .entry(*policy)
                        .or_insert_with(BTreeMap::new)
                        .insert(asset.clone(), *qty);
                } else if *qty < 0 {
                    burned
                        .entry(*policy)
                        .or_insert_with(BTreeMap::new)
                        .insert(asset.clone(), -*qty);
                }
            }
        }
        (MultiAsset::from_map(minted), MultiAsset::from_map(burned))
    }

    pub fn checked_add(&self, other: &MultiAsset) -> MultiAsset {
        let mut out: BTreeMap<PolicyId, BTreeMap<AssetName, Quantity>> = BTreeMap::new();
        for (policy, name) in Self::all_keys(self, other) {
            let sum = self.get(policy, name) + other.get(policy, name);
            out.entry(*policy).or_default().insert(name.clone(), sum);
        }
        MultiAsset::from_map(out)
    }

    pub fn checked_sub(&self, other: &MultiAsset) -> MultiAsset {
        self.checked_add(&other.negate())
    }

    /// Partial order: `self <= other` iff every quantity of `self` is `<=`
    /// the corresponding quantity of `other` (missing entries are zero).
    /// Returns `None` when the two bundles are incomparable.
    pub fn partial_cmp(&self, other: &MultiAsset) -> Option<std::cmp::Ordering> {
        use std::cmp::Ordering::*;

        let mut seen_less = false;
        let mut seen_greater = false;

        for (policy, name) in Self::all_keys(self, other) {
            let a = self.get(policy, name);
            let b = other.get(policy, name);
            match a.cmp(&b) {
                Less => seen_less = true,
                Greater => seen_greater = true,
                Equal => {}
            }
        }

        match (seen_less, seen_greater) {
            (false, false) => Some(Equal),
            (true, false) => Some(Less),
            (false, true) => Some(Greater),
            (true, true) => None,
        }
    }

    pub fn le(&self, other: &MultiAsset) -> bool {
        matches!(
            self.partial_cmp(other),
            Some(std::cmp::Ordering::Less) | Some(std::cmp::Ordering::Equal)
        )
    }
}

/// `{coin, assets}` — the full value carried by an output, or implied by a
/// transaction's consumed/produced sides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Value {
    pub coin: Coin,
    pub assets: MultiAsset,
}

impl Value {
    pub fn zero() -> Self {
        Value {
            coin: Coin::ZERO,
            assets: MultiAsset::empty(),
        }
    }

    pub fn coin_only(coin: Coin) -> Self {
        Value {
            coin,
            assets: MultiAsset::empty(),
        }
    }

    pub fn checked_add(&self, other: &Value) -> Result<Value, crate::numeric::ArithError> {
        Ok(Value {
            coin: self.coin.checked_add(other.coin)?,
            assets: self.assets.checked_add(&other.assets),
        })
    }

    pub fn eq_conserved(&self, other: &Value) -> bool {
        self.coin == other.coin && self.assets == other.assets
    }
}

impl Neg for MultiAsset {
    type Output = MultiAsset;
    fn neg(self) -> MultiAsset {
        self.negate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    fn asset_bundle(policy: u8, name: &[u8], qty: i128) -> MultiAsset {
        let mut inner = BTreeMap::new();
        inner.insert(name.to_vec(), qty);
        let mut outer = BTreeMap::new();
        outer.insert([policy; 28], inner);
        MultiAsset::from_map(outer)
    }

    #[test]
    fn zero_quantities_pruned() {
        let m = asset_bundle(1, b"A", 0);
        assert!(m.is_empty());
    }

    #[test]
    fn self_minus_self_is_zero() {
        let m = asset_bundle(1, b"A", 42);
        assert!(m.checked_sub(&m).is_empty());
    }

    #[test]
    fn partial_order_incomparable() {
        let a = asset_bundle(1, b"A", 5);
        let b = asset_bundle(2, b"B", 5);
        assert_eq!(a.partial_cmp(&b), None);
    }

    fn arb_bundle() -> impl Strategy<Value = MultiAsset> {
        proptest::collection::vec((0u8..4, proptest::collection::vec(any::<u8>(), 1..3), -1000i128..1000i128), 0..6)
            .prop_map(|entries| {
                let mut outer: BTreeMap<PolicyId, BTreeMap<AssetName, Quantity>> = BTreeMap::new();
                for (p, n, q) in entries {
                    outer.entry([p; 28]).or_default().insert(n, q);
                }
                MultiAsset::from_map(outer)
            })
    }

    proptest! {
        #[test]
        fn add_is_commutative(a in arb_bundle(), b in arb_bundle()) {
            prop_assert_eq!(a.checked_add(&b), b.checked_add(&a));
        }

        #[test]
        fn add_is_associative(a in arb_bundle(), b in arb_bundle(), c in arb_bundle()) {
            let lhs = a.checked_add(&b).checked_add(&c);
            let rhs = a.checked_add(&b.checked_add(&c));
            prop_assert_eq!(lhs, rhs);
        }

        #[test]
        fn self_sub_self_is_empty(a in arb_bundle()) {
            prop_assert!(a.checked_sub(&a).is_empty());
        }

        #[test]
        fn partial_order_reflexive(a in arb_bundle()) {
            prop_assert_eq!(a.partial_cmp(&a), Some(std::cmp::Ordering::Equal));
        }
    }
}
