//! TIA-598 fiber color code. Strand number n and splitter output port n both
//! map to `CATALOG[(n - 1) % 12]`; the mapping is a pure function and is
//! always recomputed rather than trusted from persisted hex values.

/// The fixed 12-entry color sequence, starting at strand 1.
pub const CATALOG: [(&str, &str); 12] = [
    ("Azul", "#0066CC"),
    ("Naranja", "#FF8800"),
    ("Verde", "#00AA00"),
    ("Café", "#8B4513"),
    ("Gris", "#808080"),
    ("Blanco", "#FFFFFF"),
    ("Rojo", "#FF0000"),
    ("Negro", "#000000"),
    ("Amarillo", "#FFFF00"),
    ("Violeta", "#8B00FF"),
    ("Rosa", "#FF69B4"),
    ("Verde Agua", "#00CED1"),
];

/// Color (name, hex) for a 1-based strand or splitter-port number.
pub fn for_number(number: u32) -> (&'static str, &'static str) {
    debug_assert!(number >= 1);
    CATALOG[((number - 1) % 12) as usize]
}

/// Hex for a color name, tolerating the aliases found in older records.
/// Unknown names fall back to a neutral gray.
pub fn hex_for_name(name: &str) -> &'static str {
    match name {
        "Marrón" => "#8B4513",
        "Aguamarina" => "#00CED1",
        _ => CATALOG
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, hex)| *hex)
            .unwrap_or("#999999"),
    }
}
