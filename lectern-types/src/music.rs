//! Pitch-class math shared by the pitch resolver and tests.

/// Map a pitch-class letter to its semitone offset within the octave.
///
/// Accepts upper- or lowercase letters. Accidentals are not part of the
/// letter; the rendering toolkit reports them separately and Lectern does
/// not consume them (see pitch resolver notes).
pub fn pitch_class(letter: char) -> Option<u8> {
    match letter.to_ascii_uppercase() {
        'C' => Some(0),
        'D' => Some(2),
        'E' => Some(4),
        'F' => Some(5),
        'G' => Some(7),
        'A' => Some(9),
        'B' => Some(11),
        _ => None,
    }
}

/// Numeric pitch code for a pitch-class letter and octave number.
///
/// Follows the convention that octave 4's C maps to 60:
/// `code = (octave + 1) * 12 + class`. Returns `None` for unknown letters
/// or codes outside the 0..=127 MIDI range.
pub fn pitch_code(letter: char, octave: i32) -> Option<u8> {
    let class = pitch_class(letter)? as i32;
    let code = (octave + 1) * 12 + class;
    if (0..=127).contains(&code) {
        Some(code as u8)
    } else {
        None
    }
}
