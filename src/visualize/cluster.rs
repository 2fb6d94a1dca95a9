//! Row scaling and correlation-distance hierarchical clustering

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

/// Center each row and divide by its sample standard deviation.
///
/// Rows with zero variance (or fewer than two values) become all zeros.
pub fn zscore_rows(values: ArrayView2<f64>) -> Array2<f64> {
    let n = values.ncols();
    let mut out = values.to_owned();
    for mut row in out.axis_iter_mut(Axis(0)) {
        if n < 2 {
            row.fill(0.0);
            continue;
        }
        let mean = row.sum() / n as f64;
        let var = row.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
        let sd = var.sqrt();
        if sd > 0.0 && sd.is_finite() {
            row.mapv_inplace(|x| (x - mean) / sd);
        } else {
            row.fill(0.0);
        }
    }
    out
}

/// Replace exact zeros by `epsilon`
pub fn replace_zeros(values: &mut Array2<f64>, epsilon: f64) {
    values.mapv_inplace(|x| if x == 0.0 { epsilon } else { x });
}

/// 1 - Pearson correlation; 1 when the correlation is undefined
pub fn correlation_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    let n = a.len() as f64;
    if a.len() < 2 {
        return 1.0;
    }
    let ma = a.sum() / n;
    let mb = b.sum() / n;
    let mut sab = 0.0;
    let mut saa = 0.0;
    let mut sbb = 0.0;
    for (x, y) in a.iter().zip(b.iter()) {
        let dx = x - ma;
        let dy = y - mb;
        sab += dx * dy;
        saa += dx * dx;
        sbb += dy * dy;
    }
    let r = sab / (saa * sbb).sqrt();
    if r.is_finite() {
        1.0 - r.clamp(-1.0, 1.0)
    } else {
        1.0
    }
}

/// Leaf order of an average-linkage dendrogram over the rows of `values`.
///
/// Merges are found with the nearest-neighbour chain; the left child of
/// every merge is the cluster holding the lower original row index.
pub fn average_linkage_order(values: ArrayView2<f64>) -> Vec<usize> {
    let n = values.nrows();
    if n <= 2 {
        return (0..n).collect();
    }

    let mut dist = vec![0.0; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let d = correlation_distance(values.row(i), values.row(j));
            dist[i * n + j] = d;
            dist[j * n + i] = d;
        }
    }

    let mut active = vec![true; n];
    let mut size = vec![1usize; n];
    let mut first_leaf: Vec<usize> = (0..n).collect();
    // Tree nodes: 0..n are leaves, merges are appended as (left, right)
    let mut node_of: Vec<usize> = (0..n).collect();
    let mut children: Vec<(usize, usize)> = Vec::with_capacity(n - 1);
    let mut chain: Vec<usize> = Vec::new();
    let mut remaining = n;

    while remaining > 1 {
        if chain.is_empty() {
            if let Some(start) = (0..n).find(|&i| active[i]) {
                chain.push(start);
            }
        }
        let a = chain[chain.len() - 1];
        let prev = if chain.len() >= 2 { Some(chain[chain.len() - 2]) } else { None };

        let mut best = prev;
        let mut best_d = prev.map(|p| dist[a * n + p]).unwrap_or(f64::INFINITY);
        for k in 0..n {
            if k != a && active[k] && Some(k) != prev && dist[a * n + k] < best_d {
                best = Some(k);
                best_d = dist[a * n + k];
            }
        }
        let b = match best {
            Some(b) => b,
            None => break,
        };

        if Some(b) != prev {
            chain.push(b);
            continue;
        }

        chain.pop();
        chain.pop();

        let (keep, drop) = if first_leaf[a] < first_leaf[b] { (a, b) } else { (b, a) };
        let (na, nb) = (size[keep] as f64, size[drop] as f64);
        for k in 0..n {
            if active[k] && k != keep && k != drop {
                let d = (na * dist[keep * n + k] + nb * dist[drop * n + k]) / (na + nb);
                dist[keep * n + k] = d;
                dist[k * n + keep] = d;
            }
        }
        children.push((node_of[keep], node_of[drop]));
        node_of[keep] = n + children.len() - 1;
        size[keep] += size[drop];
        active[drop] = false;
        remaining -= 1;
    }

    let root = match children.len() {
        0 => return (0..n).collect(),
        len => n + len - 1,
    };
    let mut order = Vec::with_capacity(n);
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node < n {
            order.push(node);
        } else {
            let (left, right) = children[node - n];
            stack.push(right);
            stack.push(left);
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_zscore_rows() {
        let values = array![[1.0, 2.0, 3.0], [5.0, 5.0, 5.0]];
        let z = zscore_rows(values.view());
        assert!((z[[0, 0]] + 1.0).abs() < 1e-12);
        assert_eq!(z[[0, 1]], 0.0);
        assert!((z[[0, 2]] - 1.0).abs() < 1e-12);
        assert_eq!(z.row(1).to_vec(), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_zero_replacement_after_scaling() {
        let mut z = zscore_rows(array![[1.0, 2.0, 3.0]].view());
        replace_zeros(&mut z, 1e-6);
        assert_eq!(z[[0, 1]], 1e-6);
        assert!(z.iter().all(|&v| v != 0.0));
    }

    #[test]
    fn test_correlation_distance() {
        let a = array![1.0, 2.0, 3.0];
        let b = array![2.0, 4.0, 6.0];
        let c = array![3.0, 2.0, 1.0];
        let flat = array![1.0, 1.0, 1.0];
        assert!(correlation_distance(a.view(), b.view()).abs() < 1e-12);
        assert!((correlation_distance(a.view(), c.view()) - 2.0).abs() < 1e-12);
        assert_eq!(correlation_distance(a.view(), flat.view()), 1.0);
    }

    #[test]
    fn test_similar_rows_end_up_adjacent() {
        let values = array![
            [1.0, 2.0, 3.0, 4.0],
            [4.0, 3.0, 2.0, 1.0],
            [1.0, 2.0, 3.0, 5.0],
            [5.0, 3.0, 2.0, 1.0],
            [1.1, 2.2, 2.9, 4.2]
        ];
        let order = average_linkage_order(values.view());
        let mut sorted = order.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, vec![0, 1, 2, 3, 4]);

        let pos = |r: usize| order.iter().position(|&x| x == r).unwrap();
        assert_eq!((pos(1) as i64 - pos(3) as i64).abs(), 1);
        let rising: Vec<usize> = [0, 2, 4].iter().map(|&r| pos(r)).collect();
        assert_eq!(rising.iter().max().unwrap() - rising.iter().min().unwrap(), 2);
    }
}
