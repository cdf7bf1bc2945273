//! Clustering and dimensionality reduction on z-scored complete cases.
//!
//! Both methods run several algorithms and record one outcome each.
//! Algorithms that need the full pairwise distance matrix (Ward clustering,
//! DBSCAN, MDS) refuse inputs above `max_pairwise_rows`; the silhouette score
//! is estimated on a seeded sample of that size instead.

use super::{StatisticComputer, guard_sample, numeric_columns};
use crate::config::EngineConfig;
use crate::dataset::{Dataset, complete_columns};
use crate::error::Result;
use crate::request::{AnalysisMethod, MethodFamily, Role};
use crate::result::{
    AlgorithmOutcome, Cell, FailureReason, Finding, FigureDescriptor, FigureKind, FigureSeries,
    RawOutput, Table,
};
use crate::stats::descriptive::{mean, std_dev, z_scores};
use crate::stats::matrix::{correlation_matrix, sorted_eigen};
use crate::validation::BoundRequest;
use nalgebra::DMatrix;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use tracing::{debug, info};

const DEFAULT_CLUSTERS: usize = 3;
const DEFAULT_COMPONENTS: usize = 2;
const DEFAULT_EPS: f64 = 0.5;
const DEFAULT_MIN_SAMPLES: usize = 5;
const KMEANS_RESTARTS: usize = 10;

/// Handles `clustering` and `dimensionality_reduction`.
pub struct UnsupervisedComputer;

impl StatisticComputer for UnsupervisedComputer {
    fn family(&self) -> MethodFamily {
        MethodFamily::Unsupervised
    }

    fn compute(
        &self,
        dataset: &Dataset,
        request: &BoundRequest,
        config: &EngineConfig,
    ) -> Result<RawOutput> {
        let names = request.columns(Role::Variables);
        let (columns, _) = complete_columns(&numeric_columns(dataset, request, Role::Variables)?);
        let n = columns.first().map(Vec::len).unwrap_or(0);
        if let Some(failed) = guard_sample(3, n) {
            return Ok(failed);
        }
        if let Some((name, _)) = names
            .iter()
            .zip(&columns)
            .find(|(_, c)| std_dev(c) <= f64::EPSILON)
        {
            return Ok(RawOutput::failure(FailureReason::ZeroVariance(format!(
                "'{}' is constant over the complete cases",
                name
            ))));
        }

        let scaled: Vec<Vec<f64>> = columns.iter().map(|c| z_scores(c)).collect();
        let data = Standardized {
            points: (0..n)
                .map(|i| scaled.iter().map(|c| c[i]).collect())
                .collect(),
            columns: scaled,
            original: columns,
        };

        let mut raw = RawOutput::new();
        raw.finding("n", n);
        raw.finding("n_variables", names.len());
        match request.method {
            AnalysisMethod::Clustering => cluster(&mut raw, &data, names, request, config),
            _ => reduce(&mut raw, &data, request, config),
        }
        Ok(raw.succeed())
    }
}

/// Complete cases in original units, column-major z-scores, and row-major z-scores.
struct Standardized {
    original: Vec<Vec<f64>>,
    columns: Vec<Vec<f64>>,
    points: Vec<Vec<f64>>,
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

fn pairwise_cap(n: usize, config: &EngineConfig) -> std::result::Result<(), FailureReason> {
    if n > config.max_pairwise_rows {
        return Err(FailureReason::DegenerateInput(format!(
            "{} rows exceed the pairwise limit of {}",
            n, config.max_pairwise_rows
        )));
    }
    Ok(())
}

// ============================================================================
// Clustering
// ============================================================================

/// Cluster assignment per point; `None` marks DBSCAN noise.
type Labels = Vec<Option<usize>>;

fn cluster(
    raw: &mut RawOutput,
    data: &Standardized,
    names: &[String],
    request: &BoundRequest,
    config: &EngineConfig,
) {
    let k = request
        .parameters
        .usize("n_clusters")
        .unwrap_or(DEFAULT_CLUSTERS);
    let order = request.algorithms();
    let mut best: Option<(String, f64)> = None;
    let mut sampled = false;

    for name in &order {
        let fitted: std::result::Result<(Labels, BTreeMap<String, Finding>), FailureReason> =
            match name.as_str() {
                "kmeans" => kmeans(&data.points, k, config).map(|(labels, inertia)| {
                    let labels: Labels = labels.into_iter().map(Some).collect();
                    (labels, BTreeMap::from([("inertia".to_string(), Finding::from(inertia))]))
                }),
                "hierarchical" => pairwise_cap(data.points.len(), config)
                    .map(|_| (ward(&data.points, k).into_iter().map(Some).collect(), BTreeMap::new())),
                "dbscan" => pairwise_cap(data.points.len(), config).and_then(|_| {
                    let eps = request.parameters.f64("eps").unwrap_or(DEFAULT_EPS);
                    let min_samples = request
                        .parameters
                        .usize("min_samples")
                        .unwrap_or(DEFAULT_MIN_SAMPLES);
                    let labels = dbscan(&data.points, eps, min_samples);
                    let noise = labels.iter().filter(|l| l.is_none()).count();
                    if noise == labels.len() {
                        return Err(FailureReason::DegenerateInput(format!(
                            "no dense regions at eps = {} and min_samples = {}",
                            eps, min_samples
                        )));
                    }
                    Ok((labels, BTreeMap::from([("noise_points".to_string(), Finding::from(noise))])))
                }),
                other => Err(FailureReason::DegenerateInput(format!(
                    "unknown algorithm '{}'",
                    other
                ))),
            };

        let (labels, mut findings) = match fitted {
            Ok(fitted) => fitted,
            Err(reason) => {
                info!("Clustering algorithm '{}' failed: {}", name, reason);
                raw.algorithm(name.as_str(), AlgorithmOutcome::failed(reason));
                continue;
            }
        };

        let clusters = labels.iter().flatten().max().map(|m| m + 1).unwrap_or(0);
        findings.insert("n_clusters".to_string(), Finding::from(clusters));
        let (score, was_sampled) = silhouette(&data.points, &labels, config);
        sampled |= was_sampled;
        if let Some(score) = score {
            findings.insert("silhouette".to_string(), Finding::from(score));
            if best.as_ref().is_none_or(|(_, s)| score > *s) {
                best = Some((name.clone(), score));
            }
        }
        debug!("{} produced {} clusters", name, clusters);

        raw.table(format!("clusters_{}", name), cluster_table(data, names, &labels, clusters));
        raw.figure(cluster_figure(name, data, &labels, clusters));
        raw.algorithm(name.as_str(), AlgorithmOutcome::succeeded(findings));
    }

    if sampled {
        raw.warn(format!(
            "Silhouette scores estimated on a sample of {} rows",
            config.max_pairwise_rows
        ));
    }
    if let Some((name, score)) = best {
        raw.finding("best_algorithm", name);
        raw.finding("best_silhouette", score);
    }
}

/// k-means with k-means++ seeding; the lowest-inertia restart wins.
fn kmeans(
    points: &[Vec<f64>],
    k: usize,
    config: &EngineConfig,
) -> std::result::Result<(Vec<usize>, f64), FailureReason> {
    let mut distinct: Vec<&Vec<f64>> = points.iter().collect();
    distinct.sort_by(|a, b| {
        a.iter()
            .zip(b.iter())
            .map(|(x, y)| x.total_cmp(y))
            .find(|o| o.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    distinct.dedup();
    if distinct.len() < k {
        return Err(FailureReason::DegenerateInput(format!(
            "{} distinct points cannot form {} clusters",
            distinct.len(),
            k
        )));
    }

    let mut rng = StdRng::seed_from_u64(config.random_seed);
    let mut best: Option<(Vec<usize>, f64)> = None;
    for _ in 0..KMEANS_RESTARTS {
        let mut centres = seed_centres(points, k, &mut rng);
        let mut labels = vec![usize::MAX; points.len()];
        for _ in 0..config.max_iterations {
            let mut changed = false;
            for (label, point) in labels.iter_mut().zip(points) {
                let nearest = nearest_centre(point, &centres);
                if *label != nearest {
                    *label = nearest;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
            for (c, centre) in centres.iter_mut().enumerate() {
                let members: Vec<&Vec<f64>> = points
                    .iter()
                    .zip(&labels)
                    .filter(|(_, l)| **l == c)
                    .map(|(p, _)| p)
                    .collect();
                if members.is_empty() {
                    continue;
                }
                for (j, value) in centre.iter_mut().enumerate() {
                    *value = members.iter().map(|p| p[j]).sum::<f64>() / members.len() as f64;
                }
            }
        }
        let inertia: f64 = points
            .iter()
            .zip(&labels)
            .map(|(p, l)| squared_distance(p, &centres[*l]))
            .sum();
        if best.as_ref().is_none_or(|(_, b)| inertia < *b) {
            best = Some((labels, inertia));
        }
    }
    best.ok_or_else(|| FailureReason::NonConvergence("k-means produced no solution".to_string()))
}

fn seed_centres(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centres = vec![points[rng.gen_range(0..points.len())].clone()];
    while centres.len() < k {
        let weights: Vec<f64> = points
            .iter()
            .map(|p| {
                centres
                    .iter()
                    .map(|c| squared_distance(p, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let next = match WeightedIndex::new(&weights) {
            Ok(dist) => dist.sample(rng),
            Err(_) => rng.gen_range(0..points.len()),
        };
        centres.push(points[next].clone());
    }
    centres
}

fn nearest_centre(point: &[f64], centres: &[Vec<f64>]) -> usize {
    centres
        .iter()
        .enumerate()
        .map(|(i, c)| (i, squared_distance(point, c)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

/// Agglomerative Ward clustering cut at `k` clusters.
///
/// Merges are found with the nearest-neighbour chain and replayed in height
/// order, so the cut matches the greedy dendrogram.
fn ward(points: &[Vec<f64>], k: usize) -> Vec<usize> {
    let n = points.len();
    let mut d = vec![0.0; n * n];
    for i in 0..n {
        for j in (i + 1)..n {
            let dist = squared_distance(&points[i], &points[j]);
            d[i * n + j] = dist;
            d[j * n + i] = dist;
        }
    }
    let mut size = vec![1usize; n];
    let mut active = vec![true; n];
    let mut merges: Vec<(usize, usize, f64)> = Vec::with_capacity(n.saturating_sub(1));
    let mut chain: Vec<usize> = Vec::new();

    while merges.len() + 1 < n {
        if chain.is_empty() {
            if let Some(first) = active.iter().position(|a| *a) {
                chain.push(first);
            }
        }
        let a = chain[chain.len() - 1];
        let previous = (chain.len() >= 2).then(|| chain[chain.len() - 2]);
        let mut nearest = previous;
        let mut nearest_dist = previous.map(|p| d[a * n + p]).unwrap_or(f64::INFINITY);
        for c in (0..n).filter(|&c| active[c] && c != a) {
            if d[a * n + c] < nearest_dist {
                nearest = Some(c);
                nearest_dist = d[a * n + c];
            }
        }
        let Some(b) = nearest else { break };

        if Some(b) != previous {
            chain.push(b);
            continue;
        }
        chain.truncate(chain.len() - 2);
        let (na, nb) = (size[a] as f64, size[b] as f64);
        for c in (0..n).filter(|&c| active[c] && c != a && c != b) {
            let nc = size[c] as f64;
            let updated =
                ((na + nc) * d[a * n + c] + (nb + nc) * d[b * n + c] - nc * d[a * n + b])
                    / (na + nb + nc);
            d[a * n + c] = updated;
            d[c * n + a] = updated;
        }
        merges.push((a, b, d[a * n + b]));
        size[a] += size[b];
        active[b] = false;
    }

    merges.sort_by(|x, y| x.2.total_cmp(&y.2));
    let mut parent: Vec<usize> = (0..n).collect();
    fn root(parent: &mut [usize], mut i: usize) -> usize {
        while parent[i] != i {
            parent[i] = parent[parent[i]];
            i = parent[i];
        }
        i
    }
    for &(a, b, _) in merges.iter().take(n.saturating_sub(k)) {
        let (ra, rb) = (root(&mut parent, a), root(&mut parent, b));
        parent[rb] = ra;
    }

    let mut ids: BTreeMap<usize, usize> = BTreeMap::new();
    (0..n)
        .map(|i| {
            let r = root(&mut parent, i);
            let next = ids.len();
            *ids.entry(r).or_insert(next)
        })
        .collect()
}

/// DBSCAN on Euclidean distance; `None` marks noise.
fn dbscan(points: &[Vec<f64>], eps: f64, min_samples: usize) -> Labels {
    let n = points.len();
    let eps2 = eps * eps;
    let neighbours = |i: usize| -> Vec<usize> {
        (0..n)
            .filter(|&j| squared_distance(&points[i], &points[j]) <= eps2)
            .collect()
    };

    let mut labels: Labels = vec![None; n];
    let mut visited = vec![false; n];
    let mut next_cluster = 0;
    for i in 0..n {
        if visited[i] {
            continue;
        }
        visited[i] = true;
        let seeds = neighbours(i);
        if seeds.len() < min_samples {
            continue;
        }
        labels[i] = Some(next_cluster);
        let mut queue = seeds;
        while let Some(j) = queue.pop() {
            if labels[j].is_none() {
                labels[j] = Some(next_cluster);
            }
            if visited[j] {
                continue;
            }
            visited[j] = true;
            let reach = neighbours(j);
            if reach.len() >= min_samples {
                queue.extend(reach.into_iter().filter(|&r| !visited[r] || labels[r].is_none()));
            }
        }
        next_cluster += 1;
    }
    labels
}

/// Mean silhouette over clustered points. The flag reports sampling.
fn silhouette(points: &[Vec<f64>], labels: &Labels, config: &EngineConfig) -> (Option<f64>, bool) {
    let mut members: Vec<usize> = (0..points.len()).filter(|&i| labels[i].is_some()).collect();
    let sampled = members.len() > config.max_pairwise_rows;
    if sampled {
        let mut rng = StdRng::seed_from_u64(config.random_seed);
        let picks = rand::seq::index::sample(&mut rng, members.len(), config.max_pairwise_rows);
        let mut chosen: Vec<usize> = picks.into_iter().map(|i| members[i]).collect();
        chosen.sort_unstable();
        members = chosen;
    }

    let clusters: BTreeMap<usize, Vec<usize>> =
        members.iter().fold(BTreeMap::new(), |mut acc, &i| {
            if let Some(label) = labels[i] {
                acc.entry(label).or_insert_with(Vec::new).push(i);
            }
            acc
        });
    if clusters.len() < 2 || clusters.len() >= members.len() {
        return (None, sampled);
    }

    let distance = |a: usize, b: usize| squared_distance(&points[a], &points[b]).sqrt();
    let scores: Vec<f64> = members
        .iter()
        .filter_map(|&i| {
            let own = labels[i]?;
            let mates = &clusters[&own];
            if mates.len() == 1 {
                return Some(0.0);
            }
            let a = mates.iter().filter(|&&j| j != i).map(|&j| distance(i, j)).sum::<f64>()
                / (mates.len() - 1) as f64;
            let b = clusters
                .iter()
                .filter(|(label, _)| **label != own)
                .map(|(_, other)| {
                    other.iter().map(|&j| distance(i, j)).sum::<f64>() / other.len() as f64
                })
                .fold(f64::INFINITY, f64::min);
            let denom = a.max(b);
            Some(if denom > 0.0 { (b - a) / denom } else { 0.0 })
        })
        .collect();
    (Some(mean(&scores)), sampled)
}

fn cluster_table(data: &Standardized, names: &[String], labels: &Labels, clusters: usize) -> Table {
    let mut table = Table::new(
        "Cluster sizes and centres",
        ["cluster".to_string(), "size".to_string()]
            .into_iter()
            .chain(names.iter().cloned()),
    );
    for c in 0..clusters {
        let rows: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == Some(c)).collect();
        let mut row = vec![Cell::from(format!("{}", c + 1)), Cell::from(rows.len())];
        row.extend(data.original.iter().map(|col| {
            Cell::from(mean(&rows.iter().map(|&i| col[i]).collect::<Vec<_>>()))
        }));
        table.push_row(row);
    }
    let noise = labels.iter().filter(|l| l.is_none()).count();
    if noise > 0 {
        let mut row = vec![Cell::from("noise"), Cell::from(noise)];
        row.extend(names.iter().map(|_| Cell::Empty));
        table.push_row(row);
    }
    table
}

fn cluster_figure(algorithm: &str, data: &Standardized, labels: &Labels, clusters: usize) -> FigureDescriptor {
    let x = &data.columns[0];
    let y = &data.columns[1.min(data.columns.len() - 1)];
    let mut figure = FigureDescriptor::new(FigureKind::Scatter, format!("Clusters ({})", algorithm));
    for c in 0..clusters {
        let rows: Vec<usize> = (0..labels.len()).filter(|&i| labels[i] == Some(c)).collect();
        figure = figure.with_series(FigureSeries {
            name: format!("cluster {}", c + 1),
            labels: Vec::new(),
            x: rows.iter().map(|&i| x[i]).collect(),
            y: rows.iter().map(|&i| y[i]).collect(),
        });
    }
    figure
}

// ============================================================================
// Dimensionality reduction
// ============================================================================

/// Embedding coordinates (row-major) and the share of variance retained.
type Embedding = (Vec<Vec<f64>>, f64);

fn reduce(raw: &mut RawOutput, data: &Standardized, request: &BoundRequest, config: &EngineConfig) {
    let p = data.columns.len();
    let k = request
        .parameters
        .usize("n_components")
        .unwrap_or(DEFAULT_COMPONENTS)
        .clamp(1, p);
    raw.finding("n_components", k);

    for name in request.algorithms() {
        let embedded: std::result::Result<Embedding, FailureReason> = match name.as_str() {
            "pca" => pca_embedding(raw, data, k),
            "mds" => pairwise_cap(data.points.len(), config).map(|_| mds_embedding(&data.points, k)),
            other => Err(FailureReason::DegenerateInput(format!(
                "unknown algorithm '{}'",
                other
            ))),
        };
        match embedded {
            Ok((coords, retained)) => {
                raw.figure(embedding_figure(&name, &coords));
                raw.algorithm(
                    name.as_str(),
                    AlgorithmOutcome::succeeded(BTreeMap::from([
                        ("variance_explained".to_string(), Finding::from(retained)),
                        ("n_components".to_string(), Finding::from(k)),
                    ])),
                );
            }
            Err(reason) => {
                info!("Reduction algorithm '{}' failed: {}", name, reason);
                raw.algorithm(name.as_str(), AlgorithmOutcome::failed(reason));
            }
        }
    }
}

fn pca_embedding(
    raw: &mut RawOutput,
    data: &Standardized,
    k: usize,
) -> std::result::Result<Embedding, FailureReason> {
    let r = correlation_matrix(&data.columns).ok_or_else(|| {
        FailureReason::ZeroVariance("correlation matrix could not be formed".to_string())
    })?;
    let (eigenvalues, vectors) = sorted_eigen(&r);
    let p = eigenvalues.len() as f64;

    let mut table = Table::new(
        "Explained variance",
        ["component", "eigenvalue", "variance_ratio"],
    );
    for (i, value) in eigenvalues.iter().enumerate() {
        table.push_row(vec![
            Cell::from(format!("PC{}", i + 1)),
            Cell::from(*value),
            Cell::from(value.max(0.0) / p),
        ]);
    }
    raw.table("pca_variance", table);

    let coords = data
        .points
        .iter()
        .map(|point| {
            (0..k)
                .map(|j| point.iter().enumerate().map(|(i, x)| x * vectors[(i, j)]).sum())
                .collect()
        })
        .collect();
    let retained = eigenvalues[..k].iter().map(|e| e.max(0.0)).sum::<f64>() / p;
    Ok((coords, retained))
}

/// Classical (Torgerson) MDS on Euclidean distances.
fn mds_embedding(points: &[Vec<f64>], k: usize) -> Embedding {
    let n = points.len();
    let d2 = DMatrix::from_fn(n, n, |i, j| squared_distance(&points[i], &points[j]));
    let row_means: Vec<f64> = (0..n).map(|i| d2.row(i).mean()).collect();
    let grand = row_means.iter().sum::<f64>() / n as f64;
    let b = DMatrix::from_fn(n, n, |i, j| {
        -0.5 * (d2[(i, j)] - row_means[i] - row_means[j] + grand)
    });
    let (eigenvalues, vectors) = sorted_eigen(&b);
    let positive: f64 = eigenvalues.iter().filter(|e| **e > 0.0).sum();
    let k = k.min(n);
    let coords = (0..n)
        .map(|i| {
            (0..k)
                .map(|j| vectors[(i, j)] * eigenvalues[j].max(0.0).sqrt())
                .collect()
        })
        .collect();
    let retained = if positive > 0.0 {
        eigenvalues[..k].iter().map(|e| e.max(0.0)).sum::<f64>() / positive
    } else {
        0.0
    };
    (coords, retained)
}

fn embedding_figure(algorithm: &str, coords: &[Vec<f64>]) -> FigureDescriptor {
    FigureDescriptor::new(FigureKind::Scatter, format!("Embedding ({})", algorithm)).with_series(
        FigureSeries {
            name: algorithm.to_string(),
            labels: Vec::new(),
            x: coords.iter().map(|c| c[0]).collect(),
            y: coords
                .iter()
                .map(|c| c.get(1).copied().unwrap_or(0.0))
                .collect(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::AnalysisRequest;
    use crate::result::{Status, normalize};
    use crate::validation::MethodValidator;
    use polars::prelude::*;

    fn blobs() -> Dataset {
        // three well separated groups of four points
        let x = [
            0.0, 0.2, 0.1, 0.3, 5.0, 5.2, 5.1, 5.3, 10.0, 10.1, 10.2, 10.3,
        ];
        let y = [
            0.0, 0.1, 0.3, 0.2, 5.0, 5.3, 5.1, 5.2, 0.0, 0.2, 0.1, 0.3,
        ];
        Dataset::from_frame(df!["x" => x, "y" => y].unwrap())
    }

    fn run(dataset: &Dataset, request: AnalysisRequest) -> RawOutput {
        let bound = MethodValidator::new().validate(dataset, &request).unwrap();
        UnsupervisedComputer
            .compute(dataset, &bound, &EngineConfig::default())
            .unwrap()
    }

    #[test]
    fn test_clustering_recovers_blobs() {
        let dataset = blobs();
        let raw = run(
            &dataset,
            AnalysisRequest::new(AnalysisMethod::Clustering)
                .bind_all(Role::Variables, ["x", "y"])
                .param("n_clusters", 3)
                .param("min_samples", 3),
        );
        for name in ["kmeans", "hierarchical", "dbscan"] {
            let outcome = &raw.algorithms[name];
            assert!(outcome.is_success(), "{}", name);
            assert_eq!(outcome.findings["n_clusters"].as_f64(), Some(3.0), "{}", name);
            assert!(outcome.findings["silhouette"].as_f64().unwrap() > 0.8, "{}", name);
        }
        let sizes = &raw.tables["clusters_kmeans"];
        assert!(sizes.rows.iter().all(|r| r[1] == Cell::from(4usize)));
    }

    #[test]
    fn test_kmeans_is_deterministic() {
        let dataset = blobs();
        let request = AnalysisRequest::new(AnalysisMethod::Clustering)
            .bind_all(Role::Variables, ["x", "y"])
            .param("algorithms", "kmeans");
        assert_eq!(run(&dataset, request.clone()), run(&dataset, request));
    }

    #[test]
    fn test_dbscan_without_dense_regions_fails_alone() {
        let dataset = blobs();
        let raw = run(
            &dataset,
            AnalysisRequest::new(AnalysisMethod::Clustering)
                .bind_all(Role::Variables, ["x", "y"])
                .param("algorithms", "kmeans,dbscan")
                .param("eps", 0.01),
        );
        let result = normalize(AnalysisMethod::Clustering, raw).unwrap();
        assert_eq!(result.status, Status::Partial);
        assert!(result.algorithms["kmeans"].is_success());
        assert!(!result.algorithms["dbscan"].is_success());
    }

    #[test]
    fn test_ward_merges_nearest_first() {
        let points = vec![vec![0.0], vec![0.1], vec![5.0], vec![5.2], vec![20.0]];
        let labels = ward(&points, 2);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_eq!(labels[0], labels[2]);
        assert_ne!(labels[0], labels[4]);
    }

    #[test]
    fn test_dimensionality_reduction_embeddings() {
        let dataset = blobs();
        let raw = run(
            &dataset,
            AnalysisRequest::new(AnalysisMethod::DimensionalityReduction)
                .bind_all(Role::Variables, ["x", "y"]),
        );
        let pca = raw.algorithms["pca"].findings["variance_explained"].as_f64().unwrap();
        let mds = raw.algorithms["mds"].findings["variance_explained"].as_f64().unwrap();
        assert!((pca - 1.0).abs() < 1e-9);
        assert!((mds - 1.0).abs() < 1e-9);
        assert_eq!(raw.figures.len(), 2);
        assert_eq!(raw.figures[0].series[0].x.len(), 12);
    }

    #[test]
    fn test_pairwise_cap_fails_mds_only() {
        let dataset = blobs();
        let request = AnalysisRequest::new(AnalysisMethod::DimensionalityReduction)
            .bind_all(Role::Variables, ["x", "y"]);
        let bound = MethodValidator::new().validate(&dataset, &request).unwrap();
        let config = EngineConfig {
            max_pairwise_rows: 5,
            ..EngineConfig::default()
        };
        let raw = UnsupervisedComputer.compute(&dataset, &bound, &config).unwrap();
        assert!(raw.algorithms["pca"].is_success());
        assert!(!raw.algorithms["mds"].is_success());
    }
}
