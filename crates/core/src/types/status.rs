//! Status and category enums for Gainsy records.
//!
//! Each enum round-trips through the backend as a lowercase string, parses
//! from query strings, and carries the label and badge classes the dashboard
//! renders.

/// Define a string-backed enum with presentation helpers.
///
/// Every variant declares `(key, label, badge)`: the wire/query-string key,
/// a human label, and the Tailwind classes for its status badge.
macro_rules! define_status {
    (
        $(#[$meta:meta])*
        $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => ($key:literal, $label:literal, $badge:literal)
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $key)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire and query-string representation.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $key,)+
                }
            }

            /// Human-readable label.
            #[must_use]
            pub const fn label(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }

            /// CSS classes for the status badge.
            #[must_use]
            pub const fn badge_class(self) -> &'static str {
                match self {
                    $(Self::$variant => $badge,)+
                }
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                Self::ALL
                    .iter()
                    .copied()
                    .find(|v| v.as_str().eq_ignore_ascii_case(s))
                    .ok_or_else(|| format!(concat!("invalid ", stringify!($name), ": {}"), s))
            }
        }
    };
}

define_status! {
    /// Connection state of a seller's Etsy store.
    StoreStatus {
        /// Syncing normally.
        Active => ("active", "Active", "bg-green-100 text-green-700"),
        /// Temporarily paused by the seller.
        Paused => ("paused", "Paused", "bg-yellow-100 text-yellow-700"),
        /// Etsy connection lost or revoked.
        Disconnected => ("disconnected", "Disconnected", "bg-red-100 text-red-700"),
    }
}

define_status! {
    /// Listing state of a product.
    ProductStatus {
        Active => ("active", "Active", "bg-green-100 text-green-700"),
        Draft => ("draft", "Draft", "bg-yellow-100 text-yellow-700"),
        Inactive => ("inactive", "Inactive", "bg-gray-100 text-gray-700"),
        SoldOut => ("sold_out", "Sold Out", "bg-red-100 text-red-700"),
    }
}

define_status! {
    /// What part of a listing a template fills in.
    TemplateCategory {
        Title => ("title", "Title", "bg-blue-100 text-blue-700"),
        Description => ("description", "Description", "bg-purple-100 text-purple-700"),
        Tags => ("tags", "Tags", "bg-teal-100 text-teal-700"),
        Shipping => ("shipping", "Shipping", "bg-orange-100 text-orange-700"),
        Policy => ("policy", "Shop Policy", "bg-gray-100 text-gray-700"),
    }
}

define_status! {
    /// Severity of a system alert.
    AlertSeverity {
        Info => ("info", "Info", "bg-blue-50 text-blue-800 border-blue-200"),
        Warning => ("warning", "Warning", "bg-yellow-50 text-yellow-800 border-yellow-200"),
        Critical => ("critical", "Critical", "bg-red-50 text-red-800 border-red-200"),
    }
}

impl Default for StoreStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl Default for ProductStatus {
    fn default() -> Self {
        Self::Draft
    }
}

impl Default for TemplateCategory {
    fn default() -> Self {
        Self::Description
    }
}

impl AlertSeverity {
    /// Sort rank, most severe first.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::Warning => 1,
            Self::Info => 2,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_names() {
        assert_eq!(
            serde_json::to_string(&ProductStatus::SoldOut).unwrap(),
            "\"sold_out\""
        );
        let parsed: StoreStatus = serde_json::from_str("\"disconnected\"").unwrap();
        assert_eq!(parsed, StoreStatus::Disconnected);
    }

    #[test]
    fn test_from_str_is_case_insensitive() {
        assert_eq!(
            "SOLD_OUT".parse::<ProductStatus>().unwrap(),
            ProductStatus::SoldOut
        );
        assert_eq!(
            " policy ".parse::<TemplateCategory>().unwrap(),
            TemplateCategory::Policy
        );
        let err = "archived".parse::<ProductStatus>().unwrap_err();
        assert_eq!(err, "invalid ProductStatus: archived");
    }

    #[test]
    fn test_labels() {
        assert_eq!(ProductStatus::SoldOut.label(), "Sold Out");
        assert_eq!(TemplateCategory::Policy.label(), "Shop Policy");
        assert_eq!(StoreStatus::ALL.len(), 3);
    }

    #[test]
    fn test_severity_rank_orders_critical_first() {
        let mut severities = vec![
            AlertSeverity::Info,
            AlertSeverity::Critical,
            AlertSeverity::Warning,
        ];
        severities.sort_by_key(|s| s.rank());
        assert_eq!(
            severities,
            vec![
                AlertSeverity::Critical,
                AlertSeverity::Warning,
                AlertSeverity::Info
            ]
        );
    }
}
