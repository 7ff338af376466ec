//! Field-by-field deserialization for value objects.
//!
//! Present fields carry their raw text and are parsed according to the
//! type serde asks for. Declared fields that were not found take the zero
//! value of their type: `0`, `false`, `""`, an empty sequence or `None`.

use std::str::FromStr;

use serde::de::value::{Error, MapDeserializer, SeqDeserializer};
use serde::de::{self, DeserializeOwned, Deserializer, IntoDeserializer, Visitor};

/// One value-object field as seen by the deserializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FieldValue {
    Text(String),
    Zero,
}

/// Deserializes `T` from `present` pairs, filling each name in `absent`
/// with its zero value.
pub(crate) fn from_fields<T: DeserializeOwned>(
    present: Vec<(String, String)>,
    absent: Vec<String>,
) -> Result<T, Error> {
    let entries = present
        .into_iter()
        .map(|(name, text)| (name, FieldValue::Text(text)))
        .chain(absent.into_iter().map(|name| (name, FieldValue::Zero)));
    T::deserialize(MapDeserializer::new(entries))
}

impl FieldValue {
    fn parse<V: FromStr>(text: &str) -> Result<V, Error>
    where
        V::Err: std::fmt::Display,
    {
        text.trim()
            .parse()
            .map_err(|e| de::Error::custom(format!("cannot parse '{text}': {e}")))
    }
}

impl<'de> IntoDeserializer<'de, Error> for FieldValue {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! parse_or_zero {
    ($($method:ident => $visit:ident: $ty:ty = $zero:expr;)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
                match self {
                    Self::Text(text) => visitor.$visit(Self::parse::<$ty>(&text)?),
                    Self::Zero => visitor.$visit($zero),
                }
            }
        )*
    };
}

impl<'de> Deserializer<'de> for FieldValue {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            Self::Text(text) => visitor.visit_string(text),
            Self::Zero => visitor.visit_unit(),
        }
    }

    parse_or_zero! {
        deserialize_bool => visit_bool: bool = false;
        deserialize_i8 => visit_i8: i8 = 0;
        deserialize_i16 => visit_i16: i16 = 0;
        deserialize_i32 => visit_i32: i32 = 0;
        deserialize_i64 => visit_i64: i64 = 0;
        deserialize_u8 => visit_u8: u8 = 0;
        deserialize_u16 => visit_u16: u16 = 0;
        deserialize_u32 => visit_u32: u32 = 0;
        deserialize_u64 => visit_u64: u64 = 0;
        deserialize_f32 => visit_f32: f32 = 0.0;
        deserialize_f64 => visit_f64: f64 = 0.0;
        deserialize_char => visit_char: char = '\0';
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            Self::Text(text) => visitor.visit_string(text),
            Self::Zero => visitor.visit_str(""),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match self {
            Self::Text(text) if !text.is_empty() => visitor.visit_some(Self::Text(text)),
            _ => visitor.visit_none(),
        }
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        let items: Vec<Self> = match self {
            Self::Text(text) => vec![Self::Text(text)],
            Self::Zero => Vec::new(),
        };
        visitor.visit_seq(SeqDeserializer::new(items.into_iter()))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        match self {
            Self::Text(text) => {
                visitor.visit_enum(<String as IntoDeserializer<'de, Error>>::into_deserializer(text))
            }
            Self::Zero => Err(de::Error::custom(format!("enum {name} has no zero value"))),
        }
    }

    serde::forward_to_deserialize_any! {
        bytes byte_buf unit unit_struct tuple tuple_struct map struct identifier ignored_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Filter {
        page: u32,
        size: u32,
        active: bool,
        name: String,
        ratio: f64,
        cursor: Option<String>,
        tags: Vec<String>,
    }

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_absent_fields_take_zero_values() {
        let filter: Filter = from_fields(
            pairs(&[("page", "2")]),
            names(&["size", "active", "name", "ratio", "cursor", "tags"]),
        )
        .unwrap();
        assert_eq!(
            filter,
            Filter {
                page: 2,
                size: 0,
                active: false,
                name: String::new(),
                ratio: 0.0,
                cursor: None,
                tags: Vec::new(),
            }
        );
    }

    #[test]
    fn test_present_fields_are_parsed() {
        let filter: Filter = from_fields(
            pairs(&[
                ("page", " 3 "),
                ("size", "25"),
                ("active", "true"),
                ("name", "north"),
                ("ratio", "0.5"),
                ("cursor", "abc"),
                ("tags", "red"),
            ]),
            Vec::new(),
        )
        .unwrap();
        assert_eq!(filter.page, 3);
        assert_eq!(filter.size, 25);
        assert!(filter.active);
        assert_eq!(filter.cursor.as_deref(), Some("abc"));
        assert_eq!(filter.tags, vec!["red"]);
    }

    #[test]
    fn test_unparseable_text_is_an_error() {
        let err = from_fields::<Filter>(
            pairs(&[("page", "two")]),
            names(&["size", "active", "name", "ratio", "cursor", "tags"]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("cannot parse 'two'"), "{err}");
    }

    #[derive(Debug, Deserialize)]
    enum Order {
        Asc,
    }

    #[derive(Debug, Deserialize)]
    struct Sorted {
        order: Order,
    }

    #[test]
    fn test_enums_from_text_only() {
        let sorted: Sorted = from_fields(pairs(&[("order", "Asc")]), Vec::new()).unwrap();
        assert!(matches!(sorted.order, Order::Asc));
        assert!(from_fields::<Sorted>(Vec::new(), names(&["order"])).is_err());
    }
}
