use gdb_ext::{FieldDef, Gpkg, GpkgLayer, QueryFilter, RowExt, SearchExt, Value};
use tracing_subscriber::EnvFilter;
use wkt::to_wkt::write_geometry;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("dump_layer failed: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .ok_or("Usage: dump_layer <path-to-gpkg> [layer] [where-clause]")?;
    let gpkg = Gpkg::open_read_only(path)?;

    let layers = match args.next() {
        Some(layer_name) => vec![layer_name],
        None => gpkg.list_layers()?,
    };
    let query = args
        .next()
        .map(|where_clause| QueryFilter::new().with_where(where_clause, Vec::<Value>::new()));

    for layer_name in layers {
        let layer = gpkg.open_layer(&layer_name)?;
        println!("layer: {layer_name}");
        dump_layer(&layer, query.as_ref())?;
    }

    Ok(())
}

fn dump_layer(
    layer: &GpkgLayer<'_>,
    query: Option<&QueryFilter>,
) -> Result<(), Box<dyn std::error::Error>> {
    let geometry_column = layer.geometry_column().map(|g| g.name.clone());

    for row in layer.search(query, true)? {
        let row = row?;
        let mut values = Vec::with_capacity(layer.fields().len());

        for field in layer.fields() {
            let name = field.name();
            if Some(name) == geometry_column.as_deref() {
                let wkt = match row.geometry()? {
                    Some(wkb) => {
                        let mut wkt = String::new();
                        write_geometry(&mut wkt, &wkb)?;
                        wkt
                    }
                    None => "NULL".to_string(),
                };
                values.push(format!("{name}={wkt}"));
            } else {
                values.push(format!("{name}={}", format_value(row.get_value(name)?)));
            }
        }

        println!("  row {}: {}", row.id(), values.join(", "));
    }

    Ok(())
}

fn format_value(value: Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => "NULL".to_string(),
        Some(Value::Integer(value)) => value.to_string(),
        Some(Value::Real(value)) => value.to_string(),
        Some(Value::Text(value)) => value,
        Some(Value::Blob(value)) | Some(Value::Geometry(value)) => {
            format!("<{} bytes>", value.len())
        }
    }
}
