/// Shared `Display` and string serialization for the wire-named enums below.
#[doc(hidden)]
#[macro_export]
macro_rules! impl_wire_name {
    ($enum_name:ident) => {
        impl serde::Serialize for $enum_name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.name())
            }
        }

        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

/// Open tag set: the listed variants plus `Custom(String)` for anything a
/// third-party provider invents.
#[macro_export]
macro_rules! define_id_enum {
    (
        $(#[$enum_meta:meta])*
        $enum_name:ident {
            $( $(#[$variant_meta:meta])* $variant:ident => $wire_name:literal ),* $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $enum_name {
            $( $(#[$variant_meta])* $variant, )*
            Custom(String),
        }

        impl $enum_name {
            pub fn name(&self) -> &str {
                match self {
                    $( Self::$variant => $wire_name, )*
                    Self::Custom(name) => name,
                }
            }

            /// Never fails; unknown names become `Custom`.
            pub fn from_name(name: &str) -> Self {
                match name {
                    $( $wire_name => Self::$variant, )*
                    other => Self::Custom(other.to_string()),
                }
            }

            pub fn all_variants() -> &'static [Self] {
                &[ $( Self::$variant, )* ]
            }
        }

        impl<'de> serde::Deserialize<'de> for $enum_name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let name = String::deserialize(deserializer)?;
                Ok(Self::from_name(&name))
            }
        }

        $crate::impl_wire_name!($enum_name);
    };
}

/// Closed tag set. `from_name` returns `None` for unknown names and
/// deserialization fails on them.
#[macro_export]
macro_rules! define_closed_enum {
    (
        $(#[$enum_meta:meta])*
        $enum_name:ident {
            $( $(#[$variant_meta:meta])* $variant:ident => $wire_name:literal ),* $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $enum_name {
            $( $(#[$variant_meta])* $variant, )*
        }

        impl $enum_name {
            pub fn name(&self) -> &'static str {
                match self {
                    $( Self::$variant => $wire_name, )*
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $wire_name => Some(Self::$variant), )*
                    _ => None,
                }
            }

            pub fn all_variants() -> &'static [Self] {
                &[ $( Self::$variant, )* ]
            }
        }

        impl<'de> serde::Deserialize<'de> for $enum_name {
            fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let name = String::deserialize(deserializer)?;
                Self::from_name(&name).ok_or_else(|| {
                    serde::de::Error::custom(format!(
                        "unknown {} '{}'",
                        stringify!($enum_name).to_lowercase(),
                        name
                    ))
                })
            }
        }

        $crate::impl_wire_name!($enum_name);
    };
}
