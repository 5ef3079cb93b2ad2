//! Typed flag sets persisted as integer bitmasks.
//!
//! Account attributes, API-key permissions and report reasons are all small closed
//! enumerations attached to a row as a set. Each enum implements [`Flag`] and the set
//! is a [`FlagSet`], stored in SQLite as one INTEGER and sent over JSON as an array of
//! names.

use std::fmt;
use std::marker::PhantomData;

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub trait Flag: Copy + Eq + fmt::Debug + 'static {
    /// Every variant, in bit order.
    const ALL: &'static [Self];

    fn bit(self) -> u32;
}

pub struct FlagSet<T: Flag> {
    bits: u32,
    _marker: PhantomData<T>,
}

impl<T: Flag> FlagSet<T> {
    pub fn empty() -> Self {
        Self::from_bits(0)
    }

    pub fn all() -> Self {
        T::ALL.iter().copied().collect()
    }

    /// Bits that do not correspond to a known variant are dropped.
    pub fn from_bits(bits: u32) -> Self {
        let known = T::ALL.iter().fold(0u32, |acc, flag| acc | flag.bit());
        Self {
            bits: bits & known,
            _marker: PhantomData,
        }
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    pub fn contains(&self, flag: T) -> bool {
        self.bits & flag.bit() != 0
    }

    pub fn insert(&mut self, flag: T) {
        self.bits |= flag.bit();
    }

    pub fn remove(&mut self, flag: T) {
        self.bits &= !flag.bit();
    }

    pub fn union(&self, other: &Self) -> Self {
        Self::from_bits(self.bits | other.bits)
    }

    pub fn intersection(&self, other: &Self) -> Self {
        Self::from_bits(self.bits & other.bits)
    }

    pub fn difference(&self, other: &Self) -> Self {
        Self::from_bits(self.bits & !other.bits)
    }

    pub fn is_subset(&self, other: &Self) -> bool {
        self.bits & !other.bits == 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        T::ALL.iter().copied().filter(move |flag| self.contains(*flag))
    }
}

impl<T: Flag> Clone for FlagSet<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Flag> Copy for FlagSet<T> {}

impl<T: Flag> PartialEq for FlagSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<T: Flag> Eq for FlagSet<T> {}

impl<T: Flag> Default for FlagSet<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T: Flag> fmt::Debug for FlagSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Flag> FromIterator<T> for FlagSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::empty();
        for flag in iter {
            set.insert(flag);
        }
        set
    }
}

impl<T: Flag> From<&[T]> for FlagSet<T> {
    fn from(flags: &[T]) -> Self {
        flags.iter().copied().collect()
    }
}

impl<T: Flag + Serialize> Serialize for FlagSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de, T: Flag + Deserialize<'de>> Deserialize<'de> for FlagSet<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let flags = Vec::<T>::deserialize(deserializer)?;
        Ok(flags.into_iter().collect())
    }
}

impl<T: Flag> ToSql for FlagSet<T> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(self.bits)))
    }
}

impl<T: Flag> FromSql for FlagSet<T> {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        // negative or oversized values keep only their low 32 bits
        i64::column_result(value).map(|bits| Self::from_bits(bits as u32))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountAttribute {
    Private,
    Verified,
    Admin,
    Moderator,
    InstanceAdmin,
}

impl Flag for AccountAttribute {
    const ALL: &'static [Self] = &[
        Self::Private,
        Self::Verified,
        Self::Admin,
        Self::Moderator,
        Self::InstanceAdmin,
    ];

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

/// What an API key may do on its owner's behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiKeyPermission {
    Read,
    Post,
    Comment,
    Like,
    Social,
    Report,
    UploadImages,
    EditProfile,
    Invite,
    Moderate,
    Administer,
}

impl Flag for ApiKeyPermission {
    const ALL: &'static [Self] = &[
        Self::Read,
        Self::Post,
        Self::Comment,
        Self::Like,
        Self::Social,
        Self::Report,
        Self::UploadImages,
        Self::EditProfile,
        Self::Invite,
        Self::Moderate,
        Self::Administer,
    ];

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportReason {
    Spam,
    Harassment,
    HateSpeech,
    Violence,
    SexualContent,
    IllegalContent,
    Misinformation,
    SelfHarm,
    Other,
}

impl Flag for ReportReason {
    const ALL: &'static [Self] = &[
        Self::Spam,
        Self::Harassment,
        Self::HateSpeech,
        Self::Violence,
        Self::SexualContent,
        Self::IllegalContent,
        Self::Misinformation,
        Self::SelfHarm,
        Self::Other,
    ];

    fn bit(self) -> u32 {
        1 << (self as u32)
    }
}

pub type AccountAttributes = FlagSet<AccountAttribute>;
pub type ApiKeyPermissions = FlagSet<ApiKeyPermission>;
pub type ReportReasons = FlagSet<ReportReason>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_follows_inserts_and_removes() {
        let mut attrs = AccountAttributes::empty();
        assert!(!attrs.contains(AccountAttribute::Admin));

        attrs.insert(AccountAttribute::Admin);
        attrs.insert(AccountAttribute::Verified);
        assert!(attrs.contains(AccountAttribute::Admin));
        assert!(attrs.contains(AccountAttribute::Verified));
        assert!(!attrs.contains(AccountAttribute::Moderator));

        attrs.remove(AccountAttribute::Admin);
        assert!(!attrs.contains(AccountAttribute::Admin));
        assert_eq!(attrs.iter().collect::<Vec<_>>(), vec![AccountAttribute::Verified]);
    }

    #[test]
    fn set_algebra() {
        let a: ApiKeyPermissions = [ApiKeyPermission::Read, ApiKeyPermission::Post]
            .as_slice()
            .into();
        let b: ApiKeyPermissions = [ApiKeyPermission::Post, ApiKeyPermission::Like]
            .as_slice()
            .into();

        assert_eq!(
            a.intersection(&b).iter().collect::<Vec<_>>(),
            vec![ApiKeyPermission::Post]
        );
        assert_eq!(a.union(&b).iter().count(), 3);
        assert_eq!(
            a.difference(&b).iter().collect::<Vec<_>>(),
            vec![ApiKeyPermission::Read]
        );
        assert!(a.intersection(&b).is_subset(&a));
        assert!(!a.is_subset(&b));
        assert!(ApiKeyPermissions::empty().is_subset(&a));
    }

    #[test]
    fn unknown_bits_are_dropped() {
        let set = AccountAttributes::from_bits(u32::MAX);
        assert_eq!(set, AccountAttributes::all());
        assert_eq!(set.bits(), 0b11111);
    }

    #[test]
    fn json_uses_variant_names() {
        let reasons: ReportReasons = [ReportReason::Spam, ReportReason::HateSpeech]
            .as_slice()
            .into();
        let json = serde_json::to_string(&reasons).unwrap();
        assert_eq!(json, r#"["SPAM","HATE_SPEECH"]"#);

        let parsed: ReportReasons = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, reasons);

        assert!(serde_json::from_str::<ReportReasons>(r#"["NOT_A_REASON"]"#).is_err());
    }

    #[test]
    fn persists_as_integer() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (flags INTEGER NOT NULL)").unwrap();

        let attrs: AccountAttributes = [AccountAttribute::Private, AccountAttribute::InstanceAdmin]
            .as_slice()
            .into();
        conn.execute("INSERT INTO t (flags) VALUES (?1)", [&attrs]).unwrap();

        let raw: i64 = conn.query_row("SELECT flags FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(raw, 0b10001);

        let loaded: AccountAttributes =
            conn.query_row("SELECT flags FROM t", [], |r| r.get(0)).unwrap();
        assert_eq!(loaded, attrs);
    }
}
