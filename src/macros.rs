/// Declares a protocol enumeration backed by an integer.
///
/// Every listed variant maps to exactly one code and one mnemonic (plus
/// optional aliases accepted when parsing). Codes without a variant are kept
/// in the catch-all variant so that decoding never fails on an unknown value.
/// `Display` falls back to the generic RFC 3597 style notation, e.g.
/// `TYPE65`.
macro_rules! wire_enum {
    (
        $(#[$attr:meta])*
        $name:ident($int:ty), $other:ident, $generic:literal;
        $(
            $(#[$variant_attr:meta])*
            $variant:ident = $value:literal, $mnemonic:literal $(| $alias:literal)*;
        )*
    ) => {
        $(#[$attr])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                $(#[$variant_attr])*
                $variant,
            )*
            $other($int),
        }

        impl $name {
            /// Returns the mnemonic of a known value.
            pub fn mnemonic(self) -> Option<&'static str> {
                match self {
                    $( $name::$variant => Some($mnemonic), )*
                    $name::$other(_) => None,
                }
            }

            /// Looks a value up by mnemonic, ignoring ASCII case.
            pub fn from_mnemonic(mnemonic: &str) -> Option<Self> {
                $(
                    if mnemonic.eq_ignore_ascii_case($mnemonic)
                        $( || mnemonic.eq_ignore_ascii_case($alias) )*
                    {
                        return Some($name::$variant);
                    }
                )*
                None
            }
        }

        impl From<$int> for $name {
            fn from(value: $int) -> Self {
                match value {
                    $( $value => $name::$variant, )*
                    value => $name::$other(value),
                }
            }
        }

        impl From<$name> for $int {
            fn from(value: $name) -> Self {
                match value {
                    $( $name::$variant => $value, )*
                    $name::$other(value) => value,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self.mnemonic() {
                    Some(mnemonic) => f.write_str(mnemonic),
                    None => write!(f, concat!($generic, "{}"), <$int>::from(*self)),
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = UnknownMnemonic;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::from_mnemonic(s).ok_or_else(|| UnknownMnemonic(s.to_string()))
            }
        }
    };
}
