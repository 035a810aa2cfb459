//! Approximate Bemis-Murcko framework keys from SMILES strings.
//!
//! The key keeps ring systems and the linkers between them and drops
//! acyclic substituents, stereo/charge/isotope decorations, and explicit
//! hydrogen counts. It is a textual approximation — no aromaticity
//! perception or canonicalization — but it is deterministic and groups
//! close analogues under one key, which is all the scaffold splitter
//! needs. Molecules without rings share the empty key.

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    /// Normalized atom symbol (`C`, `Cl`, aromatic `c`, ...).
    Atom(String),
    /// Ring-bond closure label (`1`..`9` or `%nn`).
    Ring(String),
    /// Bond-order marker worth keeping (`=` or `#`).
    Bond(char),
    Open,
    Close,
}

/// Compute the framework key for a SMILES string.
///
/// Returns the empty string for acyclic molecules.
#[must_use]
pub fn scaffold_key(smiles: &str) -> String {
    let tokens = tokenize(smiles);
    let pruned = prune_acyclic_branches(&tokens);
    let trimmed = trim_acyclic_ends(&pruned);
    render(&drop_unmatched_parens(trimmed))
}

fn tokenize(smiles: &str) -> Vec<Tok> {
    let chars: Vec<char> = smiles.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '[' => {
                let close = chars[i..]
                    .iter()
                    .position(|&c| c == ']')
                    .map(|off| i + off);
                match close {
                    Some(end) => {
                        if let Some(symbol) = bracket_symbol(&chars[i + 1..end]) {
                            tokens.push(Tok::Atom(symbol));
                        }
                        i = end + 1;
                    }
                    // Unterminated bracket: stop tokenizing, keep what we have.
                    None => break,
                }
            }
            '%' => {
                if i + 2 < chars.len()
                    && chars[i + 1].is_ascii_digit()
                    && chars[i + 2].is_ascii_digit()
                {
                    tokens.push(Tok::Ring(format!("%{}{}", chars[i + 1], chars[i + 2])));
                    i += 3;
                } else {
                    i += 1;
                }
            }
            '0'..='9' => {
                tokens.push(Tok::Ring(c.to_string()));
                i += 1;
            }
            '(' => {
                tokens.push(Tok::Open);
                i += 1;
            }
            ')' => {
                tokens.push(Tok::Close);
                i += 1;
            }
            '=' | '#' => {
                tokens.push(Tok::Bond(c));
                i += 1;
            }
            'A'..='Z' => {
                // Two-letter organic-subset symbols.
                let two = matches!(
                    (c, chars.get(i + 1).copied()),
                    ('C', Some('l')) | ('B', Some('r'))
                );
                if two {
                    tokens.push(Tok::Atom(format!("{}{}", c, chars[i + 1])));
                    i += 2;
                } else {
                    tokens.push(Tok::Atom(c.to_string()));
                    i += 1;
                }
            }
            'b' | 'c' | 'n' | 'o' | 'p' | 's' => {
                tokens.push(Tok::Atom(c.to_string()));
                i += 1;
            }
            // Stereo marks, charges, dots, and single bonds carry no
            // framework information.
            _ => i += 1,
        }
    }
    tokens
}

/// Extract the element symbol from a bracket-atom body, dropping isotope
/// digits, chirality, hydrogen counts, charges, and atom maps.
fn bracket_symbol(body: &[char]) -> Option<String> {
    let first = body.iter().position(|c| c.is_ascii_alphabetic())?;
    let c = body[first];
    if c.is_ascii_uppercase()
        && body
            .get(first + 1)
            .is_some_and(|n| n.is_ascii_lowercase())
    {
        Some(format!("{}{}", c, body[first + 1]))
    } else {
        Some(c.to_string())
    }
}

/// Drop every parenthesized branch that contains no ring closure.
fn prune_acyclic_branches(tokens: &[Tok]) -> Vec<Tok> {
    fn walk(tokens: &[Tok], pos: &mut usize, out: &mut Vec<Tok>) {
        while *pos < tokens.len() {
            match &tokens[*pos] {
                Tok::Open => {
                    *pos += 1;
                    let mut inner = Vec::new();
                    walk(tokens, pos, &mut inner);
                    if inner.iter().any(|t| matches!(t, Tok::Ring(_))) {
                        out.push(Tok::Open);
                        out.extend(inner);
                        out.push(Tok::Close);
                    }
                }
                Tok::Close => {
                    *pos += 1;
                    return;
                }
                tok => {
                    out.push(tok.clone());
                    *pos += 1;
                }
            }
        }
    }
    let mut out = Vec::new();
    let mut pos = 0;
    walk(tokens, &mut pos, &mut out);
    out
}

/// Cut the acyclic head and tail chains outside the first/last ring bond.
fn trim_acyclic_ends(tokens: &[Tok]) -> Vec<Tok> {
    let first_ring = tokens.iter().position(|t| matches!(t, Tok::Ring(_)));
    let last_ring = tokens.iter().rposition(|t| matches!(t, Tok::Ring(_)));
    let (Some(first_ring), Some(last_ring)) = (first_ring, last_ring) else {
        return Vec::new();
    };

    // The scaffold starts at the atom that opens the first ring.
    let start = tokens[..first_ring]
        .iter()
        .rposition(|t| matches!(t, Tok::Atom(_)))
        .unwrap_or(0);

    // ...and ends at the closure of the last ring, plus any parentheses
    // that close around it.
    let mut end = last_ring;
    while tokens.get(end + 1) == Some(&Tok::Close) {
        end += 1;
    }

    tokens[start..=end].to_vec()
}

/// Remove parentheses left unpaired by the end trim.
fn drop_unmatched_parens(tokens: Vec<Tok>) -> Vec<Tok> {
    let mut drop = vec![false; tokens.len()];
    let mut stack = Vec::new();
    for (i, tok) in tokens.iter().enumerate() {
        match tok {
            Tok::Open => stack.push(i),
            Tok::Close => {
                if stack.pop().is_none() {
                    drop[i] = true;
                }
            }
            _ => {}
        }
    }
    for i in stack {
        drop[i] = true;
    }
    tokens
        .into_iter()
        .zip(drop)
        .filter_map(|(tok, d)| (!d).then_some(tok))
        .collect()
}

fn render(tokens: &[Tok]) -> String {
    let mut out = String::new();
    for tok in tokens {
        match tok {
            Tok::Atom(s) | Tok::Ring(s) => out.push_str(s),
            Tok::Bond(c) => out.push(*c),
            Tok::Open => out.push('('),
            Tok::Close => out.push(')'),
        }
    }
    out
}
