//! Stateless helper utilities shared by the translator and the XLSX engine.

use std::collections::BTreeSet;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::conf::{C_SHEET_NAME_FALLBACK, N_LEN_EXCEL_SHEET_NAME_MAX, TUP_EXCEL_ILLEGAL};

////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().trim_matches('\'').trim().to_string();
    if c_name.is_empty() {
        c_name = C_SHEET_NAME_FALLBACK.to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Return `name` or the first free `name__N` (N >= 2), registering the result.
///
/// Excel compares sheet names case-insensitively, so `set_names_existing` holds
/// lowercase keys.
pub fn derive_unique_sheet_name(name: &str, set_names_existing: &mut BTreeSet<String>) -> String {
    if set_names_existing.insert(name.to_lowercase()) {
        return name.to_string();
    }

    let mut n_idx = 2usize;
    loop {
        let candidate = create_sheet_identifier(name, n_idx);
        if set_names_existing.insert(candidate.to_lowercase()) {
            return candidate;
        }
        n_idx += 1;
    }
}

/// Create suffixed sheet name (`base__2`, `base__3`, ...), respecting length cap.
pub fn create_sheet_identifier(base_name: &str, idx_suffix: usize) -> String {
    let c_sheet_name_suffix = format!("__{idx_suffix}");
    let n_len_base_name_max = N_LEN_EXCEL_SHEET_NAME_MAX.saturating_sub(c_sheet_name_suffix.len());

    let c_sheet_name_base: String = base_name
        .chars()
        .take(usize::max(1, n_len_base_name_max))
        .collect();

    format!("{c_sheet_name_base}{c_sheet_name_suffix}")
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ImageData

/// Decode inline base64 image bytes. Embedded whitespace (line-wrapped payloads) is ignored.
pub fn decode_image_data(image_data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let c_compact: String = image_data
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    STANDARD.decode(c_compact)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Delivery

/// Build a `Content-Disposition` header value for a workbook download.
///
/// Non-ASCII names get an ASCII `filename` fallback plus an RFC 5987
/// `filename*` parameter.
pub fn derive_content_disposition(filename: &str) -> String {
    let c_ascii: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '_',
        })
        .collect();

    if c_ascii == filename {
        return format!("attachment; filename=\"{c_ascii}\"");
    }

    format!(
        "attachment; filename=\"{c_ascii}\"; filename*=UTF-8''{}",
        urlencoding::encode(filename)
    )
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
