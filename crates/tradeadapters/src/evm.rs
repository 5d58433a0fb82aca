/// Well-formedness check for an EVM account address: 0x-prefixed, 40 hex
/// digits. Checksum casing is not enforced; exchanges accept either form.
pub(crate) fn is_evm_address(value: &str) -> bool {
    let Some(hex_part) = value.strip_prefix("0x") else {
        return false;
    };
    hex_part.len() == 40 && hex_part.chars().all(|c| c.is_ascii_hexdigit())
}
