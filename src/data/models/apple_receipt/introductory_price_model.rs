use serde::Deserialize;

/// Introductory offer metadata for one product, as produced by the native
/// StoreKit product fetch. Values arrive as strings on most OS versions but
/// numbers have been observed too.
///
/// Example:
/// {"introductoryPrice":"0.99","introductoryPriceLocale":"USD",
///  "introductoryPriceNumberOfPeriods":"1","numberOfUnits":"1","unit":"2"}
#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub(crate) struct IntroductoryPriceModel {
    pub(crate) introductory_price: Option<JsonScalar>,
    /// ISO 4217 currency code of the introductory price.
    pub(crate) introductory_price_locale: Option<JsonScalar>,
    /// Number of introductory periods (cycles).
    pub(crate) introductory_price_number_of_periods: Option<JsonScalar>,
    /// Number of `unit`s in one introductory period.
    pub(crate) number_of_units: Option<JsonScalar>,
    /// 0 = day, 1 = week, 2 = month, 3 = year.
    pub(crate) unit: Option<JsonScalar>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub(crate) enum JsonScalar {
    Text(String),
    Number(serde_json::Number),
    Flag(bool),
}

impl JsonScalar {
    pub(crate) fn to_text(&self) -> String {
        match self {
            JsonScalar::Text(text) => text.clone(),
            JsonScalar::Number(number) => number.to_string(),
            JsonScalar::Flag(flag) => flag.to_string(),
        }
    }

    pub(crate) fn to_i64(&self) -> Option<i64> {
        match self {
            JsonScalar::Text(text) => text.trim().parse().ok(),
            JsonScalar::Number(number) => number.as_i64(),
            JsonScalar::Flag(_) => None,
        }
    }
}
