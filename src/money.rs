// Money: integer minor units (cents) so nightly sums never drift

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub};

use crate::session::Locale;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const fn zero() -> Self {
        Money(0)
    }

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    // Whole currency units, e.g. from_major(150) == 150.00
    pub const fn from_major(major: i64) -> Self {
        Money(major * 100)
    }

    pub const fn cents(&self) -> i64 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// `round(self / divisor)` to whole major units, half rounded toward +inf.
    ///
    /// Matches how the booking widget rounds its average nightly rate.
    /// A zero divisor yields zero.
    pub fn div_round_major(self, divisor: i64) -> Money {
        if divisor == 0 {
            return Money::zero();
        }
        let major = round_half_up(self.0 as i128, divisor as i128 * 100);
        Money::from_cents((major * 100) as i64)
    }

    /// `round(self * percent / 100)` to whole major units, half rounded toward +inf.
    pub fn percent_round_major(self, percent: Percent) -> Money {
        let major = round_half_up(
            self.0 as i128 * percent.basis_points() as i128,
            100 * BASIS_POINTS_PER_UNIT,
        );
        Money::from_cents((major * 100) as i64)
    }

    // Clamp at zero
    pub fn floor_zero(self) -> Money {
        Money(self.0.max(0))
    }

    /// Formats the amount for display, e.g. `€1,234.50` (EN) or `1 234,50 €` (FR, RU).
    pub fn format(&self, symbol: &str, locale: Locale) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let major = abs / 100;
        let minor = abs % 100;

        match locale {
            Locale::En => format!(
                "{}{}{}.{:02}",
                sign,
                symbol,
                group_thousands(major, ','),
                minor
            ),
            Locale::Fr | Locale::Ru => format!(
                "{}{},{:02} {}",
                sign,
                group_thousands(major, ' '),
                minor,
                symbol
            ),
        }
    }
}

// 1% == 100 basis points, so 100% == 10_000
const BASIS_POINTS_PER_UNIT: i128 = 10_000;

/// A promotion percentage held in basis points (hundredths of a percent).
///
/// The store writes percentages as plain numbers (`10`, `12.5`). They are
/// read to the nearest basis point and must be finite and non-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Percent(u32);

impl Percent {
    pub const fn whole(percent: u32) -> Self {
        Percent(percent * 100)
    }

    pub const fn from_basis_points(basis_points: u32) -> Self {
        Percent(basis_points)
    }

    pub const fn basis_points(&self) -> u32 {
        self.0
    }

    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 % 100 == 0 {
            write!(f, "{}%", self.0 / 100)
        } else {
            write!(f, "{}%", self.0 as f64 / 100.0)
        }
    }
}

impl Serialize for Percent {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.0 as f64 / 100.0)
    }
}

impl<'de> Deserialize<'de> for Percent {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        let basis_points = (value * 100.0).round();
        if !basis_points.is_finite() || basis_points < 0.0 || basis_points > u32::MAX as f64 {
            return Err(serde::de::Error::custom(format!(
                "percentage must be a non-negative finite number, got {}",
                value
            )));
        }
        Ok(Percent(basis_points as u32))
    }
}

// floor(num / den + 1/2) for den > 0
fn round_half_up(num: i128, den: i128) -> i128 {
    (2 * num + den).div_euclid(2 * den)
}

fn group_thousands(value: u64, separator: char) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(ch);
    }
    grouped
}

// Store rows carry prices in major units (`150`, `99.5`); `#[serde(with = "major_units")]`
pub mod major_units {
    use super::Money;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(money: &Money, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(money.cents() as f64 / 100.0)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Money, D::Error> {
        let value = f64::deserialize(deserializer)?;
        if !value.is_finite() {
            return Err(de::Error::custom("amount must be a finite number"));
        }
        Ok(Money::from_cents((value * 100.0).round() as i64))
    }

    pub mod option {
        use super::Money;
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            money: &Option<Money>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match money {
                Some(money) => super::serialize(money, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<Money>, D::Error> {
            #[derive(Deserialize)]
            struct Wrapper(#[serde(with = "super")] Money);

            let value = Option::<Wrapper>::deserialize(deserializer)?;
            Ok(value.map(|Wrapper(money)| money))
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, rhs: i64) -> Money {
        Money(self.0 * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}
