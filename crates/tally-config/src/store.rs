//! In-memory catalog stores backing the built-in processors.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use tally_core::promotion::filter_valid;
use tally_core::{CoreResult, Promotion, PromotionStorage, TaxType};
use tracing::debug;

use crate::config::TaxTypeConfig;
use crate::error::ConfigResult;

// =============================================================================
// Promotions
// =============================================================================

/// Promotions indexed by store id.
///
/// A promotion scoped to several stores is listed under each of them, so a
/// lookup only scans the promotions of one store.
#[derive(Debug, Default)]
pub struct InMemoryPromotionStorage {
    by_store: HashMap<String, Vec<Promotion>>,
    len: usize,
}

impl InMemoryPromotionStorage {
    /// Validates and indexes `promotions`.
    pub fn new(promotions: impl IntoIterator<Item = Promotion>) -> CoreResult<Self> {
        let mut by_store: HashMap<String, Vec<Promotion>> = HashMap::new();
        let mut len = 0;

        for promotion in promotions {
            promotion.validate()?;
            for store_id in &promotion.store_ids {
                by_store
                    .entry(store_id.clone())
                    .or_default()
                    .push(promotion.clone());
            }
            len += 1;
        }

        debug!(promotions = len, stores = by_store.len(), "Promotion index built");
        Ok(Self { by_store, len })
    }

    /// Number of distinct promotions.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl PromotionStorage for InMemoryPromotionStorage {
    fn load_valid(
        &self,
        order_type_id: &str,
        store_id: &str,
        today: NaiveDate,
    ) -> CoreResult<Vec<Promotion>> {
        Ok(self
            .by_store
            .get(store_id)
            .map(|promotions| filter_valid(promotions, order_type_id, store_id, today))
            .unwrap_or_default())
    }
}

// =============================================================================
// Tax Types
// =============================================================================

/// Tax types by id, iterated in id order.
#[derive(Debug, Clone, Default)]
pub struct TaxTypeStore {
    tax_types: BTreeMap<String, TaxType>,
}

impl TaxTypeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the store from catalog records.
    pub fn from_config(records: &[TaxTypeConfig]) -> ConfigResult<Self> {
        let mut store = Self::new();
        for record in records {
            store.insert(record.to_tax_type()?);
        }
        Ok(store)
    }

    /// Adds or replaces a tax type.
    pub fn insert(&mut self, tax_type: TaxType) -> Option<TaxType> {
        self.tax_types.insert(tax_type.id.clone(), tax_type)
    }

    pub fn get(&self, id: &str) -> Option<&TaxType> {
        self.tax_types.get(id)
    }

    /// Every tax type, cloned. Zones are shared, not copied.
    pub fn all(&self) -> Vec<TaxType> {
        self.tax_types.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.tax_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tax_types.is_empty()
    }
}
