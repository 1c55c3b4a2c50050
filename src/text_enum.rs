//! A macro for fieldless enums that are stored and sent as their display text.

/// Define an enum whose variants map one-to-one onto fixed strings.
///
/// The generated enum implements `Display`, `FromStr`, serde and the rusqlite
/// SQL conversions using those strings, so the same text is used in JSON
/// bodies, query strings and the database. Parsing an unknown string yields an
/// [crate::Error::Validation] naming `$label` and the accepted values.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident ($label:literal) {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident => $text:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The text used to store and display this value.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => {
                        let expected: Vec<&str> =
                            Self::ALL.iter().map(|variant| variant.as_str()).collect();
                        Err(crate::Error::Validation(format!(
                            "\"{other}\" is not a valid {}, expected one of: {}",
                            $label,
                            expected.join(", ")
                        )))
                    }
                }
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                text.parse().map_err(serde::de::Error::custom)
            }
        }

        impl rusqlite::types::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::from(self.as_str()))
            }
        }

        impl rusqlite::types::FromSql for $name {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|error| rusqlite::types::FromSqlError::Other(Box::new(error)))
            }
        }
    };
}

pub(crate) use text_enum;

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::Error;

    text_enum! {
        /// A test enum.
        enum Colour ("colour") {
            Red => "Red",
            LightBlue => "Light Blue",
        }
    }

    #[test]
    fn parses_display_text() {
        assert_eq!("Light Blue".parse::<Colour>(), Ok(Colour::LightBlue));
        assert_eq!(Colour::LightBlue.to_string(), "Light Blue");
    }

    #[test]
    fn unknown_text_is_a_validation_error() {
        let result = "Green".parse::<Colour>();

        assert_eq!(
            result,
            Err(Error::Validation(
                "\"Green\" is not a valid colour, expected one of: Red, Light Blue".to_owned()
            ))
        );
    }

    #[test]
    fn json_uses_display_text() {
        let json = serde_json::to_string(&Colour::LightBlue).unwrap();
        assert_eq!(json, "\"Light Blue\"");

        let colour: Colour = serde_json::from_str("\"Red\"").unwrap();
        assert_eq!(colour, Colour::Red);
    }

    #[test]
    fn sql_round_trip() {
        let connection = Connection::open_in_memory().unwrap();

        let colour: Colour = connection
            .query_row("SELECT ?1", [Colour::LightBlue], |row| row.get(0))
            .unwrap();

        assert_eq!(colour, Colour::LightBlue);
    }
}
