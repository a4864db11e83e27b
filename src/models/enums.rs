//! Shared domain enums
//!
//! Every status and kind is stored as lowercase text in Postgres. The
//! conversions are written by hand instead of derived so the column type
//! stays plain `TEXT` and unknown values surface as decode errors.

macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize, utoipa::ToSchema)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $( $name::$variant => $text ),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $( $text => Ok($name::$variant), )+
                    _ => Err(format!("Invalid {}: {}", stringify!($name), s)),
                }
            }
        }

        impl sqlx::Type<sqlx::Postgres> for $name {
            fn type_info() -> sqlx::postgres::PgTypeInfo {
                <String as sqlx::Type<sqlx::Postgres>>::type_info()
            }

            fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
                <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
            }
        }

        impl<'r> sqlx::Decode<'r, sqlx::Postgres> for $name {
            fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
                let s: &str = sqlx::Decode::<sqlx::Postgres>::decode(value)?;
                s.parse().map_err(|e: String| e.into())
            }
        }

        impl sqlx::Encode<'_, sqlx::Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
                <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
            }
        }
    };
}

text_enum! {
    /// Catalog status of a book title
    pub enum BookStatus {
        Active => "active",
        /// Removed from circulation; cannot be borrowed or reserved
        Withdrawn => "withdrawn",
    }
}

text_enum! {
    /// Membership tier, which carries the default borrow limits and fee
    pub enum MembershipTier {
        Standard => "standard",
        Student => "student",
        Vip => "vip",
    }
}

text_enum! {
    pub enum MembershipStatus {
        /// Registered, no fee receipt issued yet
        Unpaid => "unpaid",
        /// Fee receipt issued, waiting for collection
        Pending => "pending",
        Paid => "paid",
        Expired => "expired",
        Locked => "locked",
    }
}

text_enum! {
    /// Staff and reader roles carried in access tokens
    pub enum Role {
        Admin => "admin",
        Librarian => "librarian",
        Accountant => "accountant",
        Warehouse => "warehouse",
        Reader => "reader",
    }
}

text_enum! {
    pub enum BorrowStatus {
        Borrowed => "borrowed",
        Returned => "returned",
        Overdue => "overdue",
    }
}

text_enum! {
    /// Condition of a copy when it comes back
    pub enum ReturnCondition {
        Good => "good",
        Damaged => "damaged",
        Lost => "lost",
    }
}

text_enum! {
    pub enum ReceiptKind {
        MembershipFee => "membership_fee",
        Fine => "fine",
    }
}

text_enum! {
    pub enum ReceiptStatus {
        Pending => "pending",
        Collected => "collected",
        Cancelled => "cancelled",
    }
}

text_enum! {
    pub enum ViolationKind {
        Late => "late",
        Damaged => "damaged",
        Lost => "lost",
    }
}

text_enum! {
    pub enum Severity {
        Minor => "minor",
        Moderate => "moderate",
        Severe => "severe",
    }
}

text_enum! {
    pub enum ViolationStatus {
        Pending => "pending",
        Processed => "processed",
    }
}

text_enum! {
    pub enum ReservationStatus {
        /// Waiting in the queue
        Pending => "pending",
        /// A copy is set aside until the hold expires
        ReadyForPickup => "ready_for_pickup",
        Fulfilled => "fulfilled",
        Cancelled => "cancelled",
        Expired => "expired",
    }
}

impl ReservationStatus {
    /// Pending or ready reservations still occupy the queue
    pub fn is_active(&self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::ReadyForPickup)
    }
}

text_enum! {
    pub enum CheckStatus {
        Draft => "draft",
        Completed => "completed",
    }
}

text_enum! {
    pub enum ProposalStatus {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Ready_For_Pickup".parse::<ReservationStatus>(), Ok(ReservationStatus::ReadyForPickup));
        assert_eq!(" LIBRARIAN ".parse::<Role>(), Ok(Role::Librarian));
        assert!("librarien".parse::<Role>().is_err());
    }

    #[test]
    fn text_matches_serde_representation() {
        for kind in ReceiptKind::ALL {
            let json = serde_json::to_string(kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
        let status: MembershipStatus = serde_json::from_str("\"locked\"").unwrap();
        assert_eq!(status, MembershipStatus::Locked);
    }

    #[test]
    fn active_reservations() {
        assert!(ReservationStatus::Pending.is_active());
        assert!(ReservationStatus::ReadyForPickup.is_active());
        assert!(!ReservationStatus::Expired.is_active());
        assert!(!ReservationStatus::Fulfilled.is_active());
    }
}
