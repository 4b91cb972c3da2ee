use vecscope_core::config::ReductionConfig;
use vecscope_core::distance::euclidean;
use vecscope_core::types::ReductionMethod;
use vecscope_reduce::{build_reducer, find_ab_params, PcaReducer, Reducer, UmapParams, UmapReducer};

/// Points spread along (1, 2, 0, 0) with small orthogonal noise.
fn line_data() -> Vec<Vec<f32>> {
    (0..20)
        .map(|i| {
            let t = i as f32 - 10.0;
            let wobble = if i % 2 == 0 { 0.05 } else { -0.05 };
            vec![t, 2.0 * t, wobble, 0.01 * (i % 3) as f32]
        })
        .collect()
}

/// Two tight clusters in 8 dimensions, pointing in unrelated directions.
fn two_clusters() -> (Vec<Vec<f32>>, usize) {
    let mut data = Vec::new();
    for i in 0..12 {
        let e = i as f32 * 0.01;
        data.push(vec![1.0, 0.9 + e, 0.8, 0.1, 0.0, 0.05, 0.0, e]);
    }
    for i in 0..12 {
        let e = i as f32 * 0.01;
        data.push(vec![0.0, 0.05, 0.1, e, 1.0, 0.9 + e, 0.8, 0.1]);
    }
    (data, 12)
}

fn centroid(points: &[Vec<f32>]) -> Vec<f32> {
    let dim = points[0].len();
    let mut c = vec![0f32; dim];
    for p in points {
        for (ci, x) in c.iter_mut().zip(p) {
            *ci += x / points.len() as f32;
        }
    }
    c
}

fn assert_layouts_match(a: &[Vec<f32>], b: &[Vec<f32>]) {
    assert_eq!(a.len(), b.len());
    for (p, q) in a.iter().zip(b) {
        assert!(euclidean(p, q) < 1e-6, "{p:?} vs {q:?}");
    }
}

fn small_umap(dims: usize) -> UmapReducer {
    UmapReducer::new(dims, UmapParams { n_neighbors: 5, ..UmapParams::default() })
}

#[test]
fn pca_first_axis_follows_the_line() {
    let mut pca = PcaReducer::new(2);
    pca.fit(&line_data()).expect("fit");
    let components = pca.components().expect("components");
    assert_eq!(components.len(), 2);
    let axis = &components[0];
    let expected = [1.0 / 5f64.sqrt(), 2.0 / 5f64.sqrt()];
    assert!((axis[0] - expected[0]).abs() < 1e-3, "axis={axis:?}");
    assert!((axis[1] - expected[1]).abs() < 1e-3, "axis={axis:?}");
}

#[test]
fn pca_variance_is_descending() {
    let mut pca = PcaReducer::new(3);
    pca.fit(&line_data()).expect("fit");
    let v = pca.explained_variance();
    assert_eq!(v.len(), 3);
    assert!(v.windows(2).all(|w| w[0] >= w[1] - 1e-9), "{v:?}");
}

#[test]
fn pca_transform_matches_fitted_coordinates() {
    let data = line_data();
    let mut pca = PcaReducer::new(3);
    let fitted = pca.fit_transform(&data).expect("fit");
    for (row, pos) in data.iter().zip(&fitted) {
        let again = pca.transform(row).expect("transform");
        assert_eq!(again.len(), 3);
        assert!(euclidean(&again, pos) < 1e-4);
    }
}

#[test]
fn pca_is_deterministic() {
    let data = line_data();
    let a = PcaReducer::new(3).fit_transform(&data).expect("fit");
    let b = PcaReducer::new(3).fit_transform(&data).expect("fit");
    assert_layouts_match(&a, &b);
}

#[test]
fn pca_axes_are_orthonormal() {
    let mut pca = PcaReducer::new(3);
    pca.fit(&line_data()).expect("fit");
    let axes = pca.components().expect("components");
    for (i, a) in axes.iter().enumerate() {
        for (j, b) in axes.iter().enumerate() {
            let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
            let expected = if i == j { 1.0 } else { 0.0 };
            assert!((dot - expected).abs() < 1e-6, "axes {i},{j}: {dot}");
        }
    }
}

#[test]
fn pca_on_constant_data_still_yields_axes() {
    let data = vec![vec![0.5f32, 0.5, 0.5]; 4];
    let mut pca = PcaReducer::new(2);
    let layout = pca.fit_transform(&data).expect("fit");
    assert!(layout.iter().flatten().all(|x| x.abs() < 1e-6));
    assert_eq!(pca.components().expect("components").len(), 2);
    assert!(pca.explained_variance().iter().all(|v| v.abs() < 1e-12));
}

#[test]
fn transform_before_fit_is_an_error() {
    assert!(PcaReducer::new(2).transform(&[1.0, 2.0, 3.0]).is_err());
    assert!(small_umap(2).transform(&[1.0, 2.0, 3.0]).is_err());
}

#[test]
fn wrong_query_dimension_is_rejected() {
    let mut pca = PcaReducer::new(2);
    pca.fit(&line_data()).expect("fit");
    assert!(pca.transform(&[1.0, 2.0]).is_err());
}

#[test]
fn ragged_or_empty_input_is_rejected() {
    assert!(PcaReducer::new(2).fit_transform(&[]).is_err());
    assert!(PcaReducer::new(2).fit_transform(&[vec![1.0, 2.0, 3.0], vec![1.0]]).is_err());
    assert!(small_umap(3).fit_transform(&[vec![1.0, 2.0]]).is_err(), "input narrower than target");
}

#[test]
fn umap_is_reproducible_for_a_fixed_seed() {
    let (data, _) = two_clusters();
    let a = small_umap(3).fit_transform(&data).expect("fit");
    let b = small_umap(3).fit_transform(&data).expect("fit");
    assert_layouts_match(&a, &b);
    assert_eq!(a.len(), data.len());
    assert!(a.iter().all(|p| p.len() == 3 && p.iter().all(|x| x.is_finite())));
}

#[test]
fn umap_separates_clusters_and_places_queries_near_their_cluster() {
    let (data, split) = two_clusters();
    let mut umap = small_umap(2);
    let layout = umap.fit_transform(&data).expect("fit");
    let ca = centroid(&layout[..split]);
    let cb = centroid(&layout[split..]);

    let spread_a = layout[..split].iter().map(|p| euclidean(p, &ca)).fold(0f32, f32::max);
    assert!(euclidean(&ca, &cb) > spread_a, "clusters overlap: gap {} vs spread {}", euclidean(&ca, &cb), spread_a);

    let query = vec![0.98, 0.93, 0.79, 0.12, 0.0, 0.04, 0.01, 0.02];
    let placed = umap.transform(&query).expect("transform");
    assert_eq!(placed.len(), 2);
    assert!(euclidean(&placed, &ca) < euclidean(&placed, &cb));
    assert_eq!(placed, umap.transform(&query).expect("transform"), "transform never refits");
}

#[test]
fn umap_single_point_sits_at_origin() {
    let mut umap = small_umap(2);
    let layout = umap.fit_transform(&[vec![0.3, 0.4, 0.5]]).expect("fit");
    assert_eq!(layout, vec![vec![0.0, 0.0]]);
    assert_eq!(umap.transform(&[0.1, 0.1, 0.1]).expect("transform"), vec![0.0, 0.0]);
}

#[test]
fn ab_params_for_default_curve() {
    let (a, b) = find_ab_params(1.0, 0.1);
    assert!(a > 1.4 && a < 1.75, "a={a}");
    assert!(b > 0.84 && b < 0.95, "b={b}");
}

#[test]
fn build_reducer_honours_config() {
    let mut cfg = ReductionConfig { dims: 2, ..ReductionConfig::default() };
    let umap = build_reducer(&cfg);
    assert_eq!(umap.method(), ReductionMethod::Umap);
    assert_eq!(umap.target_dim(), 2);
    assert!(!umap.is_fitted());

    cfg.method = ReductionMethod::Pca;
    let pca = build_reducer(&cfg);
    assert_eq!(pca.method(), ReductionMethod::Pca);
}
