pub mod blog;
pub mod collection;
pub mod product;

use serde::Deserialize;

use crate::records::Price;

/// Turns raw API nodes (REST or GraphQL shape) into canonical records.
///
/// Pure: the only state is the shop currency, used to complete bare price
/// amounts that arrive without one.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    currency: Option<String>,
}

impl Normalizer {
    pub fn new(currency: Option<String>) -> Self {
        Self { currency }
    }

    fn price(&self, raw: Option<RawMoney>) -> Option<Price> {
        match raw? {
            RawMoney::Money { amount, currency_code } => Some(Price {
                amount: amount.into_string(),
                currency_code: currency_code.or_else(|| self.currency.clone()),
            }),
            RawMoney::Bare(amount) => Some(Price {
                amount: amount.into_string(),
                currency_code: self.currency.clone(),
            }),
        }
    }
}

/// Numeric id from a GlobalID (`gid://shopify/Product/123` -> `123`);
/// anything without a `/` passes through unchanged.
pub fn numeric_id(raw: &str) -> String {
    match raw.rfind('/') {
        Some(i) => raw[i + 1..].to_string(),
        None => raw.to_string(),
    }
}

/// An id as either API hands it out: a REST integer or a GraphQL GlobalID.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawId {
    Number(serde_json::Number),
    Text(String),
}

impl RawId {
    pub(crate) fn numeric(&self) -> String {
        match self {
            RawId::Number(n) => n.to_string(),
            RawId::Text(s) => numeric_id(s),
        }
    }

    /// The GlobalID, taken from the source or rebuilt from the numeric id.
    pub(crate) fn global(&self, kind: &str, explicit: Option<String>) -> String {
        match (self, explicit) {
            (_, Some(gid)) => gid,
            (RawId::Text(s), None) if s.starts_with("gid://") => s.clone(),
            _ => format!("gid://shopify/{}/{}", kind, self.numeric()),
        }
    }
}

/// A child list that is either a plain array (REST) or a connection
/// (`{edges: [{node}]}`, GraphQL).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Seq<T> {
    Plain(Vec<T>),
    Connection { edges: Vec<Node<T>> },
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Node<T> {
    node: T,
}

impl<T> Seq<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Seq::Plain(items) => items,
            Seq::Connection { edges } => edges.into_iter().map(|e| e.node).collect(),
        }
    }
}

pub(crate) fn unwrap_seq<T>(seq: Option<Seq<T>>) -> Vec<T> {
    seq.map(Seq::into_vec).unwrap_or_default()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawTags {
    List(Vec<String>),
    Joined(String),
}

/// Canonical tag form: trimmed, non-empty tags joined with `", "`.
pub(crate) fn join_tags(tags: Option<RawTags>) -> String {
    let parts: Vec<String> = match tags {
        Some(RawTags::List(list)) => list,
        Some(RawTags::Joined(s)) => s.split(',').map(str::to_string).collect(),
        None => Vec::new(),
    };
    parts
        .iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Decimal that arrives either quoted (`"19.99"`) or as a JSON number.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawDecimal {
    Text(String),
    Number(serde_json::Number),
}

impl RawDecimal {
    fn into_string(self) -> String {
        match self {
            RawDecimal::Text(s) => s,
            RawDecimal::Number(n) => n.to_string(),
        }
    }
}

/// MoneyV2 (`{amount, currencyCode}`) or a bare amount.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawMoney {
    Money {
        amount: RawDecimal,
        #[serde(default, alias = "currencyCode")]
        currency_code: Option<String>,
    },
    Bare(RawDecimal),
}

/// Canonical unit label plus grams per unit.
fn weight_unit(unit: Option<&str>) -> Option<(&'static str, f64)> {
    match unit.unwrap_or("kg").to_ascii_lowercase().as_str() {
        "kg" | "kilograms" => Some(("kg", 1000.0)),
        "g" | "grams" => Some(("g", 1.0)),
        "lb" | "pounds" => Some(("lb", 453.592_37)),
        "oz" | "ounces" => Some(("oz", 28.349_523_125)),
        _ => None,
    }
}

/// `(canonical unit, grams)`. Grams are rounded half away from zero; a
/// source `grams` value is used only when there is no weight to convert.
pub(crate) fn weight_in_grams(
    weight: Option<f64>,
    unit: Option<&str>,
    grams: Option<i64>,
) -> (Option<String>, Option<i64>) {
    let parsed = weight_unit(unit);
    let label = parsed
        .map(|(l, _)| l.to_string())
        .or_else(|| unit.map(str::to_string));
    let converted = match (weight, parsed) {
        (Some(w), Some((_, factor))) => Some((w * factor).round() as i64),
        _ => grams,
    };
    (label, converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn global_id_extraction() {
        assert_eq!(numeric_id("gid://shopify/Product/987654"), "987654");
        assert_eq!(numeric_id("987654"), "987654");
        assert_eq!(numeric_id("gid://shop/Product/12345"), "12345");
    }

    #[test]
    fn raw_ids() {
        let n: RawId = serde_json::from_value(json!(632910392)).unwrap();
        assert_eq!(n.numeric(), "632910392");
        assert_eq!(n.global("Product", None), "gid://shopify/Product/632910392");

        let g: RawId = serde_json::from_value(json!("gid://shopify/Collection/42")).unwrap();
        assert_eq!(g.numeric(), "42");
        assert_eq!(g.global("Collection", None), "gid://shopify/Collection/42");
    }

    #[test]
    fn seq_accepts_both_shapes() {
        let plain: Seq<u32> = serde_json::from_value(json!([1, 2])).unwrap();
        let conn: Seq<u32> =
            serde_json::from_value(json!({ "edges": [{ "node": 1 }, { "node": 2 }] })).unwrap();
        assert_eq!(plain.into_vec(), conn.into_vec());
    }

    #[test]
    fn tags_converge() {
        let list: RawTags = serde_json::from_value(json!(["sale", " new ", ""])).unwrap();
        let joined: RawTags = serde_json::from_value(json!("sale,new")).unwrap();
        assert_eq!(join_tags(Some(list)), "sale, new");
        assert_eq!(join_tags(Some(joined)), "sale, new");
        assert_eq!(join_tags(None), "");
    }

    #[test]
    fn prices_keep_currency() {
        let n = Normalizer::new(Some("GBP".into()));
        let bare: RawMoney = serde_json::from_value(json!("19.99")).unwrap();
        assert_eq!(
            n.price(Some(bare)),
            Some(Price { amount: "19.99".into(), currency_code: Some("GBP".into()) })
        );
        let money: RawMoney =
            serde_json::from_value(json!({ "amount": "5.00", "currencyCode": "EUR" })).unwrap();
        assert_eq!(
            n.price(Some(money)),
            Some(Price { amount: "5.00".into(), currency_code: Some("EUR".into()) })
        );
        assert_eq!(n.price(None), None);
    }

    #[test]
    fn weight_conversion_rounds() {
        assert_eq!(weight_in_grams(Some(0.2999), Some("kg"), None), (Some("kg".into()), Some(300)));
        assert_eq!(weight_in_grams(Some(1.0), Some("POUNDS"), None), (Some("lb".into()), Some(454)));
        assert_eq!(weight_in_grams(Some(3.0), None, None), (Some("kg".into()), Some(3000)));
        assert_eq!(weight_in_grams(None, Some("g"), Some(120)), (Some("g".into()), Some(120)));
        assert_eq!(weight_in_grams(Some(2.0), Some("stone"), Some(9)), (Some("stone".into()), Some(9)));
    }
}
