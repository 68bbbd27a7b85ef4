//! `adminhub-countries`: the country catalogue.

pub mod country;
pub mod dto;
pub mod service;

pub use country::{COUNTRY_SCHEMA, Country};
pub use dto::{CountryUpdate, CreateCountryRequest, NewCountry, UpdateCountryRequest};
pub use service::CountryService;
