//! Address book entries and checkout address resolution.

use common::{AddressId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validation::{FieldError, FieldErrorCode, FieldErrors};

/// A saved address in a user's address book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub user_id: UserId,
    pub full_name: String,
    pub address_line_1: String,
    #[serde(default)]
    pub address_line_2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub region: Option<String>,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// Which address the buyer picked at checkout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressSelection {
    pub use_saved: bool,
    pub selected_id: Option<AddressId>,
}

impl AddressSelection {
    pub fn manual() -> Self {
        Self::default()
    }

    pub fn saved(selected_id: Option<AddressId>) -> Self {
        Self {
            use_saved: true,
            selected_id,
        }
    }
}

/// Address fields typed into the checkout form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualAddress {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub region: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// The canonical buyer address frozen into an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAddress {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("address not found: {0}")]
    NotFound(AddressId),

    #[error("invalid address: {0}")]
    Validation(FieldErrors),
}

impl AddressError {
    /// The field-level view of this error.
    pub fn field_errors(&self) -> FieldErrors {
        match self {
            AddressError::NotFound(id) => FieldErrors::from(FieldError::new(
                "address_id",
                FieldErrorCode::NotFound,
                format!("address {id} not found"),
            )),
            AddressError::Validation(errors) => errors.clone(),
        }
    }
}

/// Picks the address to autofill: the first marked default, else the first one.
pub fn default_address(addresses: &[Address]) -> Option<&Address> {
    addresses
        .iter()
        .find(|a| a.is_default)
        .or_else(|| addresses.first())
}

/// Splits a full name into first name and the remainder.
///
/// Extra whitespace between tokens collapses to one space.
pub fn split_full_name(full_name: &str) -> (String, String) {
    let mut tokens = full_name.split_whitespace();
    let first = tokens.next().unwrap_or_default().to_string();
    let rest = tokens.collect::<Vec<_>>().join(" ");
    (first, rest)
}

/// Produces the address to freeze into an order.
pub fn resolve(
    addresses: &[Address],
    selection: AddressSelection,
    manual: &ManualAddress,
) -> Result<ResolvedAddress, AddressError> {
    if !selection.use_saved {
        return resolve_manual(manual);
    }

    let saved = match selection.selected_id {
        Some(id) => addresses
            .iter()
            .find(|a| a.id == id)
            .ok_or(AddressError::NotFound(id))?,
        None => default_address(addresses).ok_or_else(|| {
            AddressError::Validation(FieldErrors::from(FieldError::new(
                "address_id",
                FieldErrorCode::Required,
                "no saved address to use",
            )))
        })?,
    };

    resolve_saved(saved, manual)
}

fn resolve_saved(saved: &Address, manual: &ManualAddress) -> Result<ResolvedAddress, AddressError> {
    let phone = non_blank(saved.phone.as_deref()).or_else(|| non_blank(manual.phone.as_deref()));
    let email = non_blank(manual.email.as_deref());

    let mut errors = FieldErrors::new();
    errors.require("email", email);
    errors.require("phone", phone);
    if !errors.is_empty() {
        return Err(AddressError::Validation(errors));
    }

    let (first_name, last_name) = split_full_name(&saved.full_name);
    let address = match non_blank(saved.address_line_2.as_deref()) {
        Some(line_2) => format!("{}, {}", saved.address_line_1.trim(), line_2),
        None => saved.address_line_1.trim().to_string(),
    };

    Ok(ResolvedAddress {
        first_name,
        last_name,
        address,
        city: saved.city.trim().to_string(),
        region: non_blank(saved.region.as_deref())
            .unwrap_or_default()
            .to_string(),
        postal_code: saved.postal_code.trim().to_string(),
        country: saved.country.trim().to_string(),
        email: email.unwrap_or_default().to_string(),
        phone: phone.unwrap_or_default().to_string(),
    })
}

fn resolve_manual(manual: &ManualAddress) -> Result<ResolvedAddress, AddressError> {
    let fields = [
        ("first_name", manual.first_name.as_deref()),
        ("last_name", manual.last_name.as_deref()),
        ("address", manual.address.as_deref()),
        ("country", manual.country.as_deref()),
        ("region", manual.region.as_deref()),
        ("city", manual.city.as_deref()),
        ("postal_code", manual.postal_code.as_deref()),
        ("email", manual.email.as_deref()),
        ("phone", manual.phone.as_deref()),
    ];

    let mut errors = FieldErrors::new();
    for (name, value) in fields {
        errors.require(name, value);
    }
    if !errors.is_empty() {
        return Err(AddressError::Validation(errors));
    }

    let take = |value: Option<&str>| non_blank(value).unwrap_or_default().to_string();
    Ok(ResolvedAddress {
        first_name: take(manual.first_name.as_deref()),
        last_name: take(manual.last_name.as_deref()),
        address: take(manual.address.as_deref()),
        city: take(manual.city.as_deref()),
        region: take(manual.region.as_deref()),
        postal_code: take(manual.postal_code.as_deref()),
        country: take(manual.country.as_deref()),
        email: take(manual.email.as_deref()),
        phone: take(manual.phone.as_deref()),
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn saved(full_name: &str, is_default: bool) -> Address {
        Address {
            id: AddressId::new(),
            user_id: UserId::new(),
            full_name: full_name.to_string(),
            address_line_1: "12 Abay Ave".to_string(),
            address_line_2: None,
            city: "Almaty".to_string(),
            region: None,
            postal_code: "050000".to_string(),
            country: "KZ".to_string(),
            phone: Some("+77010000000".to_string()),
            is_default,
        }
    }

    fn contact_only() -> ManualAddress {
        ManualAddress {
            email: Some("buyer@example.com".to_string()),
            ..Default::default()
        }
    }

    fn full_manual() -> ManualAddress {
        ManualAddress {
            first_name: Some("Aigerim".to_string()),
            last_name: Some("Sadykova".to_string()),
            address: Some("5 Dostyk St".to_string()),
            city: Some("Astana".to_string()),
            region: Some("Akmola".to_string()),
            postal_code: Some("010000".to_string()),
            country: Some("KZ".to_string()),
            email: Some("a@example.com".to_string()),
            phone: Some("+77020000000".to_string()),
        }
    }

    #[test]
    fn default_address_prefers_flagged_entry() {
        let book = vec![saved("A One", false), saved("B Two", true), saved("C Three", true)];
        assert_eq!(default_address(&book).unwrap().full_name, "B Two");
    }

    #[test]
    fn default_address_falls_back_to_first() {
        let book = vec![saved("A One", false), saved("B Two", false)];
        assert_eq!(default_address(&book).unwrap().full_name, "A One");
        assert!(default_address(&[]).is_none());
    }

    #[test]
    fn split_name_keeps_remainder() {
        assert_eq!(
            split_full_name("Maria  de la Cruz"),
            ("Maria".to_string(), "de la Cruz".to_string())
        );
        assert_eq!(split_full_name("Cher"), ("Cher".to_string(), String::new()));
    }

    #[test]
    fn saved_selection_by_id() {
        let mut second = saved("Dana Bek", false);
        second.address_line_2 = Some("Apt 4".to_string());
        second.region = Some("Almaty Region".to_string());
        let book = vec![saved("A One", true), second.clone()];

        let resolved =
            resolve(&book, AddressSelection::saved(Some(second.id)), &contact_only()).unwrap();

        assert_eq!(resolved.first_name, "Dana");
        assert_eq!(resolved.last_name, "Bek");
        assert_eq!(resolved.address, "12 Abay Ave, Apt 4");
        assert_eq!(resolved.region, "Almaty Region");
        assert_eq!(resolved.phone, "+77010000000");
        assert_eq!(resolved.email, "buyer@example.com");
    }

    #[test]
    fn saved_selection_unknown_id() {
        let book = vec![saved("A One", true)];
        let missing = AddressId::new();
        let err = resolve(&book, AddressSelection::saved(Some(missing)), &contact_only())
            .unwrap_err();
        assert_eq!(err, AddressError::NotFound(missing));
        assert!(err.field_errors().contains("address_id"));
    }

    #[test]
    fn saved_without_selection_uses_default() {
        let book = vec![saved("A One", false), saved("B Two", true)];
        let resolved = resolve(&book, AddressSelection::saved(None), &contact_only()).unwrap();
        assert_eq!(resolved.first_name, "B");
        assert_eq!(resolved.region, "");
    }

    #[test]
    fn saved_with_empty_book_is_validation_error() {
        let err = resolve(&[], AddressSelection::saved(None), &contact_only()).unwrap_err();
        match err {
            AddressError::Validation(errors) => assert_eq!(errors.fields(), vec!["address_id"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn saved_path_phone_falls_back_to_manual() {
        let mut entry = saved("A One", true);
        entry.phone = None;
        let manual = ManualAddress {
            phone: Some("+77779999999".to_string()),
            ..contact_only()
        };
        let resolved = resolve(&[entry.clone()], AddressSelection::saved(None), &manual).unwrap();
        assert_eq!(resolved.phone, "+77779999999");

        let err = resolve(&[entry], AddressSelection::saved(None), &ManualAddress::default())
            .unwrap_err();
        assert_eq!(err.field_errors().fields(), vec!["email", "phone"]);
    }

    #[test]
    fn manual_input_passes_through_trimmed() {
        let mut manual = full_manual();
        manual.city = Some("  Astana ".to_string());
        let resolved = resolve(&[], AddressSelection::manual(), &manual).unwrap();
        assert_eq!(resolved.city, "Astana");
        assert_eq!(resolved.first_name, "Aigerim");
    }

    #[test]
    fn manual_input_reports_every_missing_field() {
        let manual = ManualAddress {
            first_name: Some("Aigerim".to_string()),
            city: Some("   ".to_string()),
            ..Default::default()
        };
        let err = resolve(&[], AddressSelection::manual(), &manual).unwrap_err();
        assert_eq!(
            err.field_errors().fields(),
            vec![
                "last_name",
                "address",
                "country",
                "region",
                "city",
                "postal_code",
                "email",
                "phone"
            ]
        );
    }

    #[test]
    fn manual_ignores_saved_book() {
        let book = vec![saved("A One", true)];
        let resolved = resolve(&book, AddressSelection::manual(), &full_manual()).unwrap();
        assert_eq!(resolved.last_name, "Sadykova");
    }
}
