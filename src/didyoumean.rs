// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Names further away than this are not offered as suggestions.
const MAX_DISTANCE: usize = 3;

/// The candidate closest to `given`, if any is close enough to be a likely
/// typo. Ties go to the earliest candidate.
pub fn name_suggestion<I, S>(given: &str, candidates: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut best: Option<(usize, String)> = None;
    for candidate in candidates {
        let candidate = candidate.as_ref();
        let dist = strsim::levenshtein(given, candidate);
        if dist >= MAX_DISTANCE {
            continue;
        }
        match &best {
            Some((d, _)) if *d <= dist => (),
            _ => best = Some((dist, candidate.to_string())),
        }
    }
    best.map(|(_, name)| name)
}
