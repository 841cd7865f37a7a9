use deunicode::deunicode_char;

/// Longest slug the `slug` columns accept.
pub const SLUG_MAX_LEN: usize = 50;

const FALLBACK: &str = "item";

/// Normalizes `text` to a lowercase, hyphen-separated `[a-z0-9-]` token of at
/// most `max_len` characters. Non-ASCII letters are transliterated (Cyrillic
/// by its own table, everything else through `deunicode`); what is left that
/// is not ASCII alphanumeric acts as a separator.
///
/// Returns `"item"` when nothing usable is left.
pub fn slug(text: &str, max_len: usize) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_dash = false;

    for ch in text.chars().flat_map(char::to_lowercase) {
        let mut buf = [0u8; 4];
        let latin: &str = if ch.is_ascii() {
            ch.encode_utf8(&mut buf)
        } else {
            match cyrillic(ch).or_else(|| deunicode_char(ch)) {
                Some(latin) => latin,
                None => {
                    pending_dash = true;
                    continue;
                }
            }
        };

        // soft and hard signs map to nothing and do not split words
        for c in latin.chars() {
            if c.is_ascii_alphanumeric() {
                if pending_dash && !out.is_empty() {
                    out.push('-');
                }
                pending_dash = false;
                out.push(c.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }
    }

    let truncated = truncate(&out, max_len);
    if truncated.is_empty() {
        FALLBACK.to_string()
    } else {
        truncated
    }
}

/// True if `value` is already in the normalized form `slug` produces.
pub fn is_slug(value: &str) -> bool {
    !value.is_empty() && slug(value, value.len()) == value
}

/// Cuts to `max_len` characters without leaving a dangling separator.
pub(crate) fn truncate(value: &str, max_len: usize) -> String {
    let cut: String = value.chars().take(max_len).collect();
    cut.trim_end_matches('-').to_string()
}

fn cyrillic(ch: char) -> Option<&'static str> {
    let latin = match ch {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "e",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "i",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "kh",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ъ' => "",
        'ы' => "y",
        'ь' => "",
        'э' => "e",
        'ю' => "iu",
        'я' => "ia",
        'і' => "i",
        'ї' => "i",
        'є' => "ie",
        'ґ' => "g",
        _ => return None,
    };
    Some(latin)
}
