/// Canonical lookup key for a field name: lower-cased, alphanumerics only.
///
/// "Phone Number", "phone_number" and "phoneNumber" all become `phonenumber`.
pub fn normalize_field_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::normalize_field_key;

    #[test]
    fn spellings_of_the_same_name_collapse() {
        let expected = "phonenumber";
        for spelling in ["Phone Number", "phone_number", "phoneNumber", " PHONE-number "] {
            assert_eq!(normalize_field_key(spelling), expected, "{spelling}");
        }
    }

    #[test]
    fn strips_bom_and_zero_width_noise() {
        assert_eq!(normalize_field_key("\u{feff}Aadhaar\u{200b}"), "aadhaar");
    }
}
