//! Lens visualization saved objects
//!
//! Every visualization is a single form-based layer over one data view.
//! Columns are numbered in order: the primary bucket (if any), then the
//! measures, then the split bucket (if any).

use serde_json::{Map, Value, json};

const LAYER_ID: &str = "layer1";

/// Numeric column of a layer
#[derive(Debug, Clone, PartialEq)]
pub enum Measure {
    Sum(String),
    Average(String),
    Min(String),
    Max(String),
    Count,
}

impl Measure {
    pub fn sum(field: &str) -> Self {
        Measure::Sum(field.to_string())
    }

    pub fn average(field: &str) -> Self {
        Measure::Average(field.to_string())
    }

    fn operation(&self) -> (&'static str, &str) {
        match self {
            Measure::Sum(f) => ("sum", f.as_str()),
            Measure::Average(f) => ("average", f.as_str()),
            Measure::Min(f) => ("min", f.as_str()),
            Measure::Max(f) => ("max", f.as_str()),
            Measure::Count => ("count", "___records___"),
        }
    }
}

/// Bucketing column of a layer
#[derive(Debug, Clone, PartialEq)]
pub enum Bucket {
    /// Top `size` values of a keyword field, ordered by the first measure
    Terms { field: String, size: u32 },
    /// Values of a keyword field in alphabetical order
    Categories { field: String, size: u32 },
    /// Date histogram on `@timestamp` (`"auto"`, `"d"`, ...)
    DateHistogram { interval: String },
}

impl Bucket {
    pub fn terms(field: &str, size: u32) -> Self {
        Bucket::Terms {
            field: field.to_string(),
            size,
        }
    }

    pub fn categories(field: &str, size: u32) -> Self {
        Bucket::Categories {
            field: field.to_string(),
            size,
        }
    }

    pub fn by_day() -> Self {
        Bucket::DateHistogram {
            interval: "d".to_string(),
        }
    }

    pub fn auto_dates() -> Self {
        Bucket::DateHistogram {
            interval: "auto".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesType {
    Line,
    Area,
    Bar,
    BarHorizontal,
}

impl SeriesType {
    fn as_str(self) -> &'static str {
        match self {
            SeriesType::Line => "line",
            SeriesType::Area => "area",
            SeriesType::Bar => "bar",
            SeriesType::BarHorizontal => "bar_horizontal",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chart {
    Metric,
    Donut,
    Xy(SeriesType),
    Table,
}

impl Chart {
    fn visualization_type(self) -> &'static str {
        match self {
            Chart::Metric => "lnsMetric",
            Chart::Donut => "lnsPie",
            Chart::Xy(_) => "lnsXY",
            Chart::Table => "lnsDatatable",
        }
    }
}

/// A Lens visualization ready to be saved
#[derive(Debug, Clone)]
pub struct Lens {
    pub id: String,
    pub title: String,
    pub description: String,
    pub data_view_id: String,
    chart: Chart,
    primary: Option<(String, Bucket)>,
    measures: Vec<(String, Measure)>,
    split: Option<(String, Bucket)>,
    query: String,
    filters: Vec<Value>,
}

impl Lens {
    pub fn new(id: &str, title: &str, data_view_id: &str, chart: Chart) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            data_view_id: data_view_id.to_string(),
            chart,
            primary: None,
            measures: Vec::new(),
            split: None,
            query: String::new(),
            filters: Vec::new(),
        }
    }

    /// Single-number tile
    pub fn metric(id: &str, title: &str, data_view_id: &str, measure: Measure) -> Self {
        Self::new(id, title, data_view_id, Chart::Metric).measure(title, measure)
    }

    /// Donut of `measure` split by the top values of `field`
    pub fn donut(
        id: &str,
        title: &str,
        data_view_id: &str,
        (group_label, field): (&str, &str),
        size: u32,
        (measure_label, measure): (&str, Measure),
    ) -> Self {
        Self::new(id, title, data_view_id, Chart::Donut)
            .bucket(group_label, Bucket::terms(field, size))
            .measure(measure_label, measure)
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Set the primary bucket (x axis, slice groups or first table column)
    pub fn bucket(mut self, label: &str, bucket: Bucket) -> Self {
        self.primary = Some((label.to_string(), bucket));
        self
    }

    pub fn measure(mut self, label: &str, measure: Measure) -> Self {
        self.measures.push((label.to_string(), measure));
        self
    }

    /// Break series down by a second bucket
    pub fn split_by(mut self, label: &str, bucket: Bucket) -> Self {
        self.split = Some((label.to_string(), bucket));
        self
    }

    /// KQL query applied to the layer
    pub fn query(mut self, kql: &str) -> Self {
        self.query = kql.to_string();
        self
    }

    /// Pin the visualization to one value of a keyword field
    pub fn filter_phrase(mut self, field: &str, value: &str) -> Self {
        self.filters.push(json!({
            "meta": {
                "alias": null,
                "negate": false,
                "disabled": false,
                "type": "phrase",
                "key": field,
                "params": {"query": value},
                "index": self.data_view_id
            },
            "query": {"match_phrase": {field: value}}
        }));
        self
    }

    pub fn chart(&self) -> Chart {
        self.chart
    }

    fn column_ids(&self) -> (Option<String>, Vec<String>, Option<String>) {
        let mut next = 1;
        let mut id = || {
            let value = format!("col{}", next);
            next += 1;
            value
        };
        let primary = self.primary.as_ref().map(|_| id());
        let measures = self.measures.iter().map(|_| id()).collect();
        let split = self.split.as_ref().map(|_| id());
        (primary, measures, split)
    }

    fn bucket_column(label: &str, bucket: &Bucket, order_by: Option<&str>) -> Value {
        match bucket {
            Bucket::Terms { field, size } | Bucket::Categories { field, size } => {
                let mut params = json!({"size": size, "orderDirection": "desc"});
                match (bucket, order_by) {
                    (Bucket::Terms { .. }, Some(column)) => {
                        params["orderBy"] = json!({"type": "column", "columnId": column});
                    }
                    _ => {
                        params["orderBy"] = json!({"type": "alphabetical"});
                        params["orderDirection"] = json!("asc");
                    }
                }
                json!({
                    "dataType": "string",
                    "isBucketed": true,
                    "label": label,
                    "operationType": "terms",
                    "sourceField": field,
                    "params": params
                })
            }
            Bucket::DateHistogram { interval } => json!({
                "dataType": "date",
                "isBucketed": true,
                "label": label,
                "operationType": "date_histogram",
                "sourceField": "@timestamp",
                "params": {"interval": interval}
            }),
        }
    }

    fn measure_column(label: &str, measure: &Measure) -> Value {
        let (operation, field) = measure.operation();
        json!({
            "dataType": "number",
            "isBucketed": false,
            "label": label,
            "operationType": operation,
            "sourceField": field
        })
    }

    fn visualization(&self, primary: Option<&str>, measures: &[String], split: Option<&str>) -> Value {
        let first_measure = measures.first().map(String::as_str).unwrap_or_default();
        match self.chart {
            Chart::Metric => json!({
                "layerId": LAYER_ID,
                "layerType": "data",
                "metricAccessor": first_measure
            }),
            Chart::Donut => json!({
                "shape": "donut",
                "layers": [{
                    "layerId": LAYER_ID,
                    "layerType": "data",
                    "primaryGroups": primary.into_iter().collect::<Vec<_>>(),
                    "metrics": [first_measure],
                    "numberDisplay": "percent",
                    "categoryDisplay": "default",
                    "legendDisplay": "show"
                }]
            }),
            Chart::Xy(series) => {
                let mut layer = json!({
                    "layerId": LAYER_ID,
                    "accessors": measures,
                    "position": "top",
                    "seriesType": series.as_str(),
                    "showGridlines": false,
                    "layerType": "data"
                });
                if let Some(x) = primary {
                    layer["xAccessor"] = json!(x);
                }
                if let Some(s) = split {
                    layer["splitAccessor"] = json!(s);
                }
                let all_axes = json!({"x": true, "yLeft": true, "yRight": true});
                json!({
                    "legend": {"isVisible": true, "position": "right"},
                    "valueLabels": "hide",
                    "fittingFunction": "None",
                    "axisTitlesVisibilitySettings": all_axes,
                    "tickLabelsVisibilitySettings": all_axes,
                    "gridlinesVisibilitySettings": all_axes,
                    "preferredSeriesType": series.as_str(),
                    "layers": [layer]
                })
            }
            Chart::Table => {
                let columns: Vec<Value> = primary
                    .into_iter()
                    .chain(measures.iter().map(String::as_str))
                    .chain(split)
                    .map(|id| json!({"columnId": id}))
                    .collect();
                json!({
                    "layerId": LAYER_ID,
                    "layerType": "data",
                    "columns": columns
                })
            }
        }
    }

    /// The Lens `state` object
    pub fn state(&self) -> Value {
        let (primary_id, measure_ids, split_id) = self.column_ids();
        let order_by = measure_ids.first().map(String::as_str);

        let mut columns = Map::new();
        let mut order = Vec::new();
        if let (Some(id), Some((label, bucket))) = (&primary_id, &self.primary) {
            columns.insert(id.clone(), Self::bucket_column(label, bucket, order_by));
            order.push(id.clone());
        }
        for (id, (label, measure)) in measure_ids.iter().zip(&self.measures) {
            columns.insert(id.clone(), Self::measure_column(label, measure));
            order.push(id.clone());
        }
        if let (Some(id), Some((label, bucket))) = (&split_id, &self.split) {
            columns.insert(id.clone(), Self::bucket_column(label, bucket, order_by));
            order.push(id.clone());
        }

        json!({
            "datasourceStates": {
                "formBased": {
                    "layers": {
                        LAYER_ID: {
                            "columnOrder": order,
                            "columns": columns,
                            "indexPatternId": self.data_view_id
                        }
                    }
                }
            },
            "visualization": self.visualization(
                primary_id.as_deref(),
                &measure_ids,
                split_id.as_deref()
            ),
            "visualizationType": self.chart.visualization_type(),
            "query": {"query": self.query, "language": "kuery"},
            "filters": self.filters
        })
    }

    /// Saved-object body (`attributes` + `references`)
    pub fn to_saved_object(&self) -> Value {
        json!({
            "attributes": {
                "title": self.title,
                "description": self.description,
                "visualizationType": self.chart.visualization_type(),
                "state": self.state()
            },
            "references": [{
                "id": self.data_view_id,
                "name": format!("indexpattern-datasource-layer-{}", LAYER_ID),
                "type": "index-pattern"
            }]
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_state() {
        let lens = Lens::metric("lens-total-credits", "Total credits", "dv", Measure::sum("credits"));
        let state = lens.state();
        let layer = &state["datasourceStates"]["formBased"]["layers"]["layer1"];

        assert_eq!(layer["columnOrder"], json!(["col1"]));
        assert_eq!(layer["columns"]["col1"]["operationType"], "sum");
        assert_eq!(layer["columns"]["col1"]["sourceField"], "credits");
        assert_eq!(state["visualization"]["metricAccessor"], "col1");
        assert_eq!(state["visualizationType"], "lnsMetric");
    }

    #[test]
    fn test_xy_with_split_orders_terms_by_measure() {
        let lens = Lens::new("trend", "Trend", "dv", Chart::Xy(SeriesType::Line))
            .bucket("@timestamp", Bucket::auto_dates())
            .measure("Credits", Measure::sum("credits"))
            .split_by("Cluster", Bucket::terms("cluster_name", 5));
        let state = lens.state();
        let columns = &state["datasourceStates"]["formBased"]["layers"]["layer1"]["columns"];

        assert_eq!(columns["col1"]["operationType"], "date_histogram");
        assert_eq!(columns["col3"]["params"]["orderBy"]["columnId"], "col2");
        let layer = &state["visualization"]["layers"][0];
        assert_eq!(layer["xAccessor"], "col1");
        assert_eq!(layer["accessors"], json!(["col2"]));
        assert_eq!(layer["splitAccessor"], "col3");
        assert_eq!(layer["seriesType"], "line");
    }

    #[test]
    fn test_donut_and_table() {
        let donut = Lens::donut(
            "d",
            "By env",
            "dv",
            ("Environment", "environment_name"),
            10,
            ("Credits", Measure::sum("credits")),
        );
        let state = donut.state();
        assert_eq!(state["visualization"]["shape"], "donut");
        assert_eq!(state["visualization"]["layers"][0]["primaryGroups"], json!(["col1"]));
        assert_eq!(state["visualization"]["layers"][0]["metrics"], json!(["col2"]));

        let table = Lens::new("t", "Table", "dv", Chart::Table)
            .bucket("Cluster", Bucket::terms("cluster_name", 15))
            .measure("Credits", Measure::sum("credits"))
            .measure("Records", Measure::Count);
        let state = table.state();
        assert_eq!(state["visualization"]["columns"].as_array().unwrap().len(), 3);
        assert_eq!(
            state["datasourceStates"]["formBased"]["layers"]["layer1"]["columns"]["col3"]["sourceField"],
            "___records___"
        );
    }

    #[test]
    fn test_saved_object_references_data_view() {
        let lens = Lens::metric("m", "M", "cdp-records-dataview", Measure::Count)
            .describe("All records")
            .filter_phrase("cluster_name", "etl");
        let object = lens.to_saved_object();

        assert_eq!(object["attributes"]["description"], "All records");
        assert_eq!(object["references"][0]["id"], "cdp-records-dataview");
        assert_eq!(
            object["references"][0]["name"],
            "indexpattern-datasource-layer-layer1"
        );
        let filter = &object["attributes"]["state"]["filters"][0];
        assert_eq!(filter["query"]["match_phrase"]["cluster_name"], "etl");
    }
}
