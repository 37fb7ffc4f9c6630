//! Country/city reference data for the two dependent dropdowns.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::error;

const BUILTIN_COUNTRIES: &str = include_str!("../../data/countries.json");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Country {
    pub code: String,
    pub name: String,
    pub cities: Vec<String>,
}

/// Ordered country list; order is display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryCatalog {
    countries: Vec<Country>,
}

impl CountryCatalog {
    /// Catalog bundled with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_COUNTRIES).context("parse bundled countries.json")
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let countries: Vec<Country> = serde_json::from_str(raw).context("parse country list")?;
        Ok(Self { countries })
    }

    pub fn countries(&self) -> &[Country] {
        &self.countries
    }

    pub fn get(&self, code: &str) -> Option<&Country> {
        self.countries.iter().find(|country| country.code == code)
    }

    pub fn has_city(&self, code: &str, city: &str) -> bool {
        self.get(code)
            .is_some_and(|country| country.cities.iter().any(|c| c == city))
    }
}

/// One `<option>` of a dropdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub disabled: bool,
}

impl SelectOption {
    fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
            disabled: false,
        }
    }
}

/// Country dropdown options.
///
/// Without a catalog the list degrades to the placeholder plus one disabled
/// notice option.
pub fn country_options(catalog: Option<&CountryCatalog>) -> Vec<SelectOption> {
    let mut options = vec![SelectOption::new("", "Select Country")];
    let Some(catalog) = catalog else {
        error!("country reference data not loaded");
        options.push(SelectOption {
            disabled: true,
            ..SelectOption::new("", "Country data not loaded")
        });
        return options;
    };
    options.extend(
        catalog
            .countries()
            .iter()
            .map(|country| SelectOption::new(&country.code, &country.name)),
    );
    options
}

/// City dropdown options for the selected country code.
pub fn city_options(catalog: Option<&CountryCatalog>, code: &str) -> Vec<SelectOption> {
    let mut options = vec![SelectOption::new("", "Select City")];
    if let Some(country) = catalog.and_then(|catalog| catalog.get(code)) {
        options.extend(
            country
                .cities
                .iter()
                .map(|city| SelectOption::new(city, city)),
        );
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_keeps_display_order() {
        let catalog = CountryCatalog::builtin().expect("catalog");
        let codes: Vec<&str> = catalog
            .countries()
            .iter()
            .map(|c| c.code.as_str())
            .collect();
        assert_eq!(
            codes,
            vec!["US", "CA", "GB", "AU", "IN", "PK", "CN", "DE", "FR", "BR"]
        );
        assert!(catalog.has_city("US", "Chicago"));
        assert!(catalog.has_city("CN", "Xi'an"));
        assert!(!catalog.has_city("CA", "Chicago"));
    }

    #[test]
    fn country_options_start_with_placeholder() {
        let catalog = CountryCatalog::builtin().expect("catalog");
        let options = country_options(Some(&catalog));
        assert_eq!(options.len(), 11);
        assert_eq!(options[0].label, "Select Country");
        assert_eq!(options[1].value, "US");
        assert_eq!(options[1].label, "United States");
    }

    /// Missing reference data degrades instead of failing.
    #[test]
    fn country_options_degrade_without_catalog() {
        let options = country_options(None);
        assert_eq!(options.len(), 2);
        assert!(options[1].disabled);
        assert_eq!(options[1].label, "Country data not loaded");
    }

    #[test]
    fn city_options_follow_selected_country() {
        let catalog = CountryCatalog::builtin().expect("catalog");
        assert_eq!(city_options(Some(&catalog), "GB").len(), 11);
        assert_eq!(city_options(Some(&catalog), "").len(), 1);
        assert_eq!(city_options(Some(&catalog), "ZZ").len(), 1);
        assert_eq!(city_options(None, "GB").len(), 1);
    }
}
