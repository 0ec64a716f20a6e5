use sorrel::{
    DataValue, DistanceMetric, Document, FieldIndices, FieldInfo, IndicesOptions, QueryParams,
    Schema, SearchAlgorithm, VectorParams,
};

fn vector_indices(params: VectorParams) -> FieldIndices {
    let schema = Schema::builder()
        .field(FieldInfo::text("title"))
        .field(FieldInfo::vector("v", params))
        .build();
    let mut indices = FieldIndices::new(schema, IndicesOptions::default(), None);

    let docs = [
        (1u64, vec![0.0f32, 0.0], "near origin"),
        (2u64, vec![1.0, 0.0], "east"),
        (3u64, vec![0.0, 1.0], "north"),
        (4u64, vec![10.0, 10.0], "far away"),
    ];
    for (id, vector, title) in docs {
        let doc = Document::new()
            .add_field("v", DataValue::Vector(vector))
            .add_field("title", DataValue::Text(title.into()));
        assert!(indices.add(id, &doc));
    }
    indices
}

fn knn_search(indices: &FieldIndices, query: &str, params: &QueryParams) -> sorrel::SearchResult {
    let mut algo = SearchAlgorithm::new();
    assert!(algo.init(query, Some(params)), "query should parse: {query}");
    algo.search(indices)
}

#[test]
fn flat_knn_with_star_filter() {
    let indices = vector_indices(VectorParams::flat(2));
    let params = QueryParams::new().with_vector("q", vec![0.1, 0.1]);
    let result = knn_search(&indices, "*=>[KNN 2 @v $q]", &params);

    assert!(result.error.is_none());
    assert_eq!(result.total, 2);
    // (0,0) is nearest; (1,0) and (0,1) tie and the lower id wins.
    assert_eq!(result.ids, [1, 2]);
    assert_eq!(result.preagg_total, 4);

    // Scores run parallel to ids, ascending by distance.
    assert_eq!(result.knn_scores.len(), 2);
    assert_eq!(result.knn_scores[0].0, 1);
    assert_eq!(result.knn_scores[1].0, 2);
    assert!(result.knn_scores[0].1 <= result.knn_scores[1].1);
}

#[test]
fn flat_knn_with_filter_expression() {
    let indices = vector_indices(VectorParams::flat(2));
    let params = QueryParams::new().with_vector("q", vec![0.0, 0.0]);
    // Only "east" and "far away" survive the filter.
    let result = knn_search(&indices, "@title:(east | far) =>[KNN 2 @v $q]", &params);

    assert_eq!(result.ids, [2, 4]);
    assert_eq!(result.preagg_total, 2);
}

#[test]
fn knn_limit_larger_than_candidates() {
    let indices = vector_indices(VectorParams::flat(2));
    let params = QueryParams::new().with_vector("q", vec![0.0, 0.0]);
    let result = knn_search(&indices, "*=>[KNN 10 @v $q]", &params);
    assert_eq!(result.ids.len(), 4);
    assert_eq!(result.ids[0], 1);
}

#[test]
fn hnsw_knn_matches_flat_on_small_data() {
    let flat = vector_indices(VectorParams::flat(2));
    let hnsw = vector_indices(VectorParams::hnsw(2));
    let params = QueryParams::new().with_vector("q", vec![0.1, 0.1]);

    let flat_result = knn_search(&flat, "*=>[KNN 3 @v $q EF_RUNTIME 50]", &params);
    let hnsw_result = knn_search(&hnsw, "*=>[KNN 3 @v $q EF_RUNTIME 50]", &params);

    assert_eq!(flat_result.ids, hnsw_result.ids);
    for (f, h) in flat_result.knn_scores.iter().zip(&hnsw_result.knn_scores) {
        assert_eq!(f.0, h.0);
        assert!((f.1 - h.1).abs() < 1e-6);
    }
}

#[test]
fn hnsw_knn_with_filter() {
    let indices = vector_indices(VectorParams::hnsw(2));
    let params = QueryParams::new().with_vector("q", vec![0.0, 0.0]);
    let result = knn_search(&indices, "@title:(north | far) =>[KNN 2 @v $q EF_RUNTIME 50]", &params);

    assert_eq!(result.ids, [3, 4]);
    assert_eq!(result.preagg_total, 2);
}

#[test]
fn cosine_metric_ranks_by_angle() {
    let indices = vector_indices(VectorParams::flat(2).with_metric(DistanceMetric::Cosine));
    let params = QueryParams::new().with_vector("q", vec![1.0, 0.05]);
    let result = knn_search(&indices, "*=>[KNN 1 @v $q]", &params);

    // (1, 0) is almost parallel to the query even though (0, 0) is closer
    // in the plane.
    assert_eq!(result.ids, [2]);
}

#[test]
fn dimension_mismatch_is_an_error() {
    let indices = vector_indices(VectorParams::flat(2));
    let params = QueryParams::new().with_vector("q", vec![0.0, 0.0, 0.0]);
    let result = knn_search(&indices, "*=>[KNN 2 @v $q]", &params);

    assert_eq!(
        result.error.as_deref(),
        Some("Wrong vector index dimensions, got: 3, expected: 2")
    );
    assert!(result.ids.is_empty());
}

#[test]
fn knn_against_non_vector_field_is_an_error() {
    let indices = vector_indices(VectorParams::flat(2));
    let params = QueryParams::new().with_vector("q", vec![0.0, 0.0]);
    let result = knn_search(&indices, "*=>[KNN 2 @title $q]", &params);

    assert_eq!(
        result.error.as_deref(),
        Some("Wrong access type for field: title")
    );
}

#[test]
fn docs_without_vectors_are_skipped_by_flat_scan() {
    let schema = Schema::builder()
        .field(FieldInfo::vector("v", VectorParams::flat(2)))
        .build();
    let mut indices = FieldIndices::new(schema, IndicesOptions::default(), None);
    indices.add(1, &Document::new().add_field("v", DataValue::Vector(vec![0.0, 0.0])));
    indices.add(2, &Document::new());

    let params = QueryParams::new().with_vector("q", vec![0.0, 0.0]);
    let result = knn_search(&indices, "*=>[KNN 5 @v $q]", &params);
    assert_eq!(result.ids, [1]);
    assert_eq!(result.preagg_total, 2);
}
