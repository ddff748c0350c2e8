//! Barcode strings for new products.
//!
//! EAN-13 and UPC-A codes carry a valid check digit. Anything else gets an
//! opaque `INV` identifier that is not a real Code 128 symbol.

use rand::Rng;
use serde::Serialize;

pub const FALLBACK_PREFIX: &str = "INV";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarcodeFormat {
    Ean13,
    UpcA,
    Code128,
}

impl BarcodeFormat {
    /// Case-insensitive; unknown tags fall back to `Code128`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_uppercase().as_str() {
            "EAN13" | "EAN-13" => BarcodeFormat::Ean13,
            "UPC" | "UPCA" | "UPC-A" => BarcodeFormat::UpcA,
            _ => BarcodeFormat::Code128,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GeneratedBarcode {
    pub barcode: String,
    pub format: String,
}

fn digit_values(code: &str) -> impl Iterator<Item = u32> + '_ {
    code.chars().filter_map(|c| c.to_digit(10))
}

/// EAN-13 check digit for a 12 digit payload: weight 1 at even indexes and 3
/// at odd indexes, counting from 0.
pub fn ean13_check_digit(payload: &str) -> u32 {
    let sum: u32 = digit_values(payload)
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d } else { d * 3 })
        .sum();
    (10 - sum % 10) % 10
}

/// UPC-A check digit for an 11 digit payload: weight 3 at even indexes and 1
/// at odd indexes.
pub fn upca_check_digit(payload: &str) -> u32 {
    let sum: u32 = digit_values(payload)
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { d * 3 } else { d })
        .sum();
    (10 - sum % 10) % 10
}

fn random_digits<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

pub fn generate_with<R: Rng>(format: BarcodeFormat, rng: &mut R) -> String {
    match format {
        BarcodeFormat::Ean13 => {
            let payload = random_digits(rng, 12);
            format!("{}{}", payload, ean13_check_digit(&payload))
        }
        BarcodeFormat::UpcA => {
            let payload = random_digits(rng, 11);
            format!("{}{}", payload, upca_check_digit(&payload))
        }
        BarcodeFormat::Code128 => format!("{}{}", FALLBACK_PREFIX, random_digits(rng, 10)),
    }
}

pub fn generate(tag: &str) -> GeneratedBarcode {
    let format = BarcodeFormat::from_tag(tag);
    GeneratedBarcode {
        barcode: generate_with(format, &mut rand::thread_rng()),
        format: tag.trim().to_ascii_uppercase(),
    }
}
