/// Case-insensitive similarity ratio in `[0, 1]`.
///
/// `2 * M / (len(a) + len(b))`, where `M` is the number of characters
/// covered by the matching blocks found by taking the longest common
/// substring, then recursing into the pieces left and right of it. Among
/// equally long matches the one starting earliest in `a`, then earliest in
/// `b`, wins. Lengths count chars, not bytes. Two empty strings are equal.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase().chars().collect::<Vec<_>>();
    let b = b.to_lowercase().chars().collect::<Vec<_>>();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matched = matching_chars(&a, &b);
    2.0 * matched as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            queue.push((i + size, ahi, j + size, bhi));
        }
    }
    matched
}

/// Longest common run of `a[alo..ahi]` and `b[blo..bhi]` as `(i, j, size)`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
    let width = bhi - blo;
    // run[k + 1] holds the length of the match ending at (i - 1, blo + k).
    let mut prev = vec![0usize; width + 1];
    let mut run = vec![0usize; width + 1];
    for i in alo..ahi {
        for j in blo..bhi {
            let k = j - blo;
            run[k + 1] = if a[i] == b[j] { prev[k] + 1 } else { 0 };
            if run[k + 1] > best_size {
                best_size = run[k + 1];
                best_i = i + 1 - best_size;
                best_j = j + 1 - best_size;
            }
        }
        std::mem::swap(&mut prev, &mut run);
    }
    (best_i, best_j, best_size)
}
