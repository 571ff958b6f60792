//! Parsing of temporal primitive values (DA, TM and DT).
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use snafu::{ensure, Backtrace, OptionExt, Snafu};
use std::ops::{Add, Mul, Sub};

#[derive(Debug, Snafu)]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Unexpected end of element"))]
    UnexpectedEndOfElement { backtrace: Backtrace },
    #[snafu(display("Invalid date"))]
    InvalidDate { backtrace: Backtrace },
    #[snafu(display("Invalid time"))]
    InvalidTime { backtrace: Backtrace },
    #[snafu(display("Invalid time zone offset"))]
    InvalidTimeZone { backtrace: Backtrace },
    #[snafu(display("Expected fraction delimiter '.', got '{}'", *value as char))]
    FractionDelimiter { value: u8, backtrace: Backtrace },
    #[snafu(display("Invalid number length: it is {}, but must be between 1 and 9", len))]
    InvalidNumberLength { len: usize, backtrace: Backtrace },
    #[snafu(display("Invalid number token: got '{}', but must be a digit in '0'..='9'", *value as char))]
    InvalidNumberToken { value: u8, backtrace: Backtrace },
    #[snafu(display("Invalid time zone sign token: got '{}', but must be '+' or '-'", *value as char))]
    InvalidTimeZoneSignToken { value: u8, backtrace: Backtrace },
    #[snafu(display("Unexpected trailing bytes after value"))]
    TrailingBytes { backtrace: Backtrace },
}

type Result<T, E = Error> = std::result::Result<T, E>;

/// Decode a single DICOM Date (DA) into a `NaiveDate` value.
///
/// A full 8 byte representation (YYYYMMDD) is required.
/// The legacy form with period separators (YYYY.MM.DD) is also accepted.
pub fn parse_date(buf: &[u8]) -> Result<NaiveDate> {
    let (year, month, day) = match buf.len() {
        8 => (
            read_number(&buf[0..4])?,
            read_number(&buf[4..6])?,
            read_number(&buf[6..8])?,
        ),
        10 if buf[4] == b'.' && buf[7] == b'.' => (
            read_number(&buf[0..4])?,
            read_number(&buf[5..7])?,
            read_number(&buf[8..10])?,
        ),
        len if len > 8 => return TrailingBytesSnafu.fail(),
        _ => return UnexpectedEndOfElementSnafu.fail(),
    };
    NaiveDate::from_ymd_opt(year, month, day).context(InvalidDateSnafu)
}

/// Decode a single DICOM Time (TM) into a `NaiveTime` value.
///
/// Any prefix of the form `HHMMSS.FFFFFF` is accepted,
/// where missing components are zero.
/// The legacy form with colon separators (HH:MM:SS) is also accepted.
pub fn parse_time(buf: &[u8]) -> Result<NaiveTime> {
    let (time, rest) = parse_time_prefix(buf)?;
    ensure!(rest.is_empty(), TrailingBytesSnafu);
    Ok(time)
}

fn parse_time_prefix(buf: &[u8]) -> Result<(NaiveTime, &[u8])> {
    ensure!(buf.len() >= 2, UnexpectedEndOfElementSnafu);
    let hour: u32 = read_number(&buf[0..2])?;
    let mut buf = &buf[2..];
    if buf.first() == Some(&b':') {
        buf = &buf[1..];
    }
    let minute = take_pair(&mut buf, 0)?;
    if buf.first() == Some(&b':') {
        buf = &buf[1..];
    }
    let second = take_pair(&mut buf, 0)?;
    let mut micro = 0;
    if let Some(&c) = buf.first() {
        if c == b'.' {
            let digits = buf[1..]
                .iter()
                .take(6)
                .take_while(|c| c.is_ascii_digit())
                .count();
            ensure!(digits > 0, UnexpectedEndOfElementSnafu);
            let fraction: u32 = read_number(&buf[1..=digits])?;
            micro = fraction * 10u32.pow(6 - digits as u32);
            buf = &buf[1 + digits..];
        } else if c.is_ascii_digit() {
            return FractionDelimiterSnafu { value: c }.fail();
        }
    }
    let time = NaiveTime::from_hms_micro_opt(hour, minute, second, micro).context(InvalidTimeSnafu)?;
    Ok((time, buf))
}

/// Decode a single DICOM Date Time (DT) into a `DateTime` value.
///
/// The year is mandatory, every other component may be omitted,
/// in which case it takes its lowest possible value.
/// The `default_offset` is used when the value has no time zone suffix.
pub fn parse_datetime(buf: &[u8], default_offset: FixedOffset) -> Result<DateTime<FixedOffset>> {
    ensure!(buf.len() >= 4, UnexpectedEndOfElementSnafu);
    let year: i32 = read_number(&buf[0..4])?;
    let mut buf = &buf[4..];

    let month = take_pair(&mut buf, 1)?;
    let day = take_pair(&mut buf, 1)?;
    let date = NaiveDate::from_ymd_opt(year, month, day).context(InvalidDateSnafu)?;

    let (time, rest) = if buf.first().map_or(false, u8::is_ascii_digit) {
        parse_time_prefix(buf)?
    } else {
        (NaiveTime::MIN, buf)
    };

    let offset = match rest {
        [] => default_offset,
        [sign, digits @ ..] if digits.len() == 4 => {
            let hours: i32 = read_number(&digits[0..2])?;
            let minutes: i32 = read_number(&digits[2..4])?;
            let seconds = hours * 3600 + minutes * 60;
            match sign {
                b'+' => FixedOffset::east_opt(seconds),
                b'-' => FixedOffset::west_opt(seconds),
                c => return InvalidTimeZoneSignTokenSnafu { value: *c }.fail(),
            }
            .context(InvalidTimeZoneSnafu)?
        }
        _ => return TrailingBytesSnafu.fail(),
    };

    offset
        .from_local_datetime(&date.and_time(time))
        .single()
        .context(InvalidDateSnafu)
}

/// Consume a two digit component, or yield `default` if absent.
fn take_pair(buf: &mut &[u8], default: u32) -> Result<u32> {
    let rest: &[u8] = *buf;
    match rest.get(0..2) {
        Some(digits) if digits.iter().all(u8::is_ascii_digit) => {
            *buf = &rest[2..];
            read_number(digits)
        }
        _ => Ok(default),
    }
}

/// Retrieve an integer in text form.
///
/// All bytes in the text must be within the range b'0' and b'9'
/// The text must also not be empty nor have more than 9 characters.
pub fn read_number<T>(text: &[u8]) -> Result<T>
where
    T: Mul<T, Output = T>,
    T: From<u8>,
    T: Add<T, Output = T>,
    T: Sub<T, Output = T>,
    T: Clone,
{
    if text.is_empty() || text.len() > 9 {
        return InvalidNumberLengthSnafu { len: text.len() }.fail();
    }
    if let Some(c) = text.iter().cloned().find(|&b| !b.is_ascii_digit()) {
        return InvalidNumberTokenSnafu { value: c }.fail();
    }

    Ok(read_number_unchecked(text))
}

#[inline]
fn read_number_unchecked<T>(buf: &[u8]) -> T
where
    T: Mul<T, Output = T>,
    T: From<u8>,
    T: Add<T, Output = T>,
    T: Clone,
{
    debug_assert!(!buf.is_empty());
    debug_assert!(buf.len() < 10);
    buf[1..].iter().fold((buf[0] - b'0').into(), |acc, v| {
        acc * T::from(10) + T::from(*v - b'0')
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date(b"20180101").unwrap(),
            NaiveDate::from_ymd_opt(2018, 1, 1).unwrap()
        );
        assert_eq!(
            parse_date(b"19711231").unwrap(),
            NaiveDate::from_ymd_opt(1971, 12, 31).unwrap()
        );
        assert_eq!(
            parse_date(b"1993.05.06").unwrap(),
            NaiveDate::from_ymd_opt(1993, 5, 6).unwrap()
        );
        assert!(matches!(parse_date(b"20180230"), Err(Error::InvalidDate { .. })));
        assert!(matches!(
            parse_date(b"2018"),
            Err(Error::UnexpectedEndOfElement { .. })
        ));
        assert!(matches!(
            parse_date(b"2018AB01"),
            Err(Error::InvalidNumberToken { value: b'A', .. })
        ));
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(
            parse_time(b"10").unwrap(),
            NaiveTime::from_hms_opt(10, 0, 0).unwrap()
        );
        assert_eq!(
            parse_time(b"0755").unwrap(),
            NaiveTime::from_hms_opt(7, 55, 0).unwrap()
        );
        assert_eq!(
            parse_time(b"235959.5").unwrap(),
            NaiveTime::from_hms_micro_opt(23, 59, 59, 500_000).unwrap()
        );
        assert_eq!(
            parse_time(b"101010.000001").unwrap().nanosecond(),
            1_000
        );
        assert_eq!(
            parse_time(b"07:30:00").unwrap(),
            NaiveTime::from_hms_opt(7, 30, 0).unwrap()
        );
        assert!(parse_time(b"25").is_err());
        assert!(matches!(
            parse_time(b"101010x"),
            Err(Error::TrailingBytes { .. })
        ));
        assert!(parse_time(b"1").is_err());
    }

    #[test]
    fn test_parse_datetime() {
        let utc = FixedOffset::east_opt(0).unwrap();
        let dt = parse_datetime(b"20171130101010.204", utc).unwrap();
        assert_eq!(
            dt,
            utc.with_ymd_and_hms(2017, 11, 30, 10, 10, 10).unwrap()
                + chrono::Duration::microseconds(204_000)
        );

        let dt = parse_datetime(b"2017", utc).unwrap();
        assert_eq!(dt, utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap());

        let dt = parse_datetime(b"201711301010-0130", utc).unwrap();
        let offset = FixedOffset::west_opt(5400).unwrap();
        assert_eq!(dt, offset.with_ymd_and_hms(2017, 11, 30, 10, 10, 0).unwrap());

        assert!(matches!(
            parse_datetime(b"20171130*0100", utc),
            Err(Error::InvalidTimeZoneSignToken { value: b'*', .. })
        ));
        assert!(parse_datetime(b"201", utc).is_err());
    }

    #[test]
    fn test_read_number() {
        assert_eq!(read_number::<u32>(b"0012").unwrap(), 12);
        assert!(read_number::<u32>(b"").is_err());
        assert!(read_number::<u32>(b"1234567890").is_err());
    }
}
