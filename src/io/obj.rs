//! Wavefront OBJ format support.
//!
//! Reads `v`, `vt` and `f` records; polygons are fan triangulated and every
//! other record is ignored. Texture coordinates referenced by faces become
//! UV layer 0 of a [`UvMesh`], with one element per distinct
//! (vertex, texture coordinate) pair.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::{Point2, Point3};

use crate::error::{MeshError, Result};
use crate::mesh::{
    build_from_triangles, ElementId, FaceId, HalfEdgeMesh, MeshIndex, UvMesh, UvOverlay,
};

/// Parsed OBJ content, already triangulated.
#[derive(Debug, Default)]
struct ObjData {
    positions: Vec<Point3<f64>>,
    tex_coords: Vec<Point2<f64>>,
    faces: Vec<[usize; 3]>,
    face_tex: Vec<Option<[usize; 3]>>,
}

/// Load the geometry of an OBJ file, ignoring texture coordinates.
///
/// # Example
///
/// ```no_run
/// use morsel_uv::io::obj;
/// use morsel_uv::mesh::HalfEdgeMesh;
///
/// let mesh: HalfEdgeMesh = obj::load("model.obj").unwrap();
/// ```
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<HalfEdgeMesh<I>> {
    let path = path.as_ref();
    let data = read(path)?;
    build_from_triangles(&data.positions, &data.faces)
}

/// Load an OBJ file with its texture coordinates in UV layer 0.
///
/// Faces without texture coordinates are left without UVs.
pub fn load_uv<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<UvMesh<I>> {
    let path = path.as_ref();
    let data = read(path)?;
    into_uv_mesh(data)
}

/// Save the geometry of a mesh as OBJ.
pub fn save<P: AsRef<Path>, I: MeshIndex>(mesh: &HalfEdgeMesh<I>, path: P) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    write_obj(&mut writer, mesh, None)?;
    writer.flush()?;
    Ok(())
}

/// Save a mesh as OBJ with UV layer `layer` as its texture coordinates.
pub fn save_uv<P: AsRef<Path>, I: MeshIndex>(uv_mesh: &UvMesh<I>, layer: usize, path: P) -> Result<()> {
    let path = path.as_ref();
    let overlay = uv_mesh.uv_layer(layer).ok_or_else(|| MeshError::SaveError {
        path: path.to_path_buf(),
        message: format!("mesh has no UV layer {}", layer),
    })?;
    let mut writer = BufWriter::new(File::create(path)?);
    write_obj(&mut writer, uv_mesh.mesh(), Some(overlay))?;
    writer.flush()?;
    Ok(())
}

fn read(path: &Path) -> Result<ObjData> {
    let file = File::open(path)?;
    parse(BufReader::new(file)).map_err(|message| MeshError::LoadError {
        path: path.to_path_buf(),
        message,
    })
}

fn parse<R: BufRead>(reader: R) -> std::result::Result<ObjData, String> {
    let mut data = ObjData::default();
    for (number, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| e.to_string())?;
        let at = |message: String| format!("line {}: {}", number + 1, message);
        let mut fields = line.split_whitespace();
        let Some(kind) = fields.next() else {
            continue;
        };
        match kind {
            "v" => {
                let [x, y, z] = parse_floats::<3>(&mut fields).map_err(at)?;
                data.positions.push(Point3::new(x, y, z));
            }
            "vt" => {
                let [u, v] = parse_floats::<2>(&mut fields).map_err(at)?;
                data.tex_coords.push(Point2::new(u, v));
            }
            "f" => {
                let corners = fields
                    .map(|field| parse_corner(field, data.positions.len(), data.tex_coords.len()))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(at)?;
                if corners.len() < 3 {
                    return Err(at(format!("face has {} corners", corners.len())));
                }
                let textured = corners.iter().all(|c| c.1.is_some());
                for k in 1..corners.len() - 1 {
                    let fan = [corners[0], corners[k], corners[k + 1]];
                    data.faces.push(fan.map(|c| c.0));
                    data.face_tex
                        .push(textured.then(|| fan.map(|c| c.1.unwrap_or_default())));
                }
            }
            _ => {}
        }
    }
    Ok(data)
}

fn parse_floats<const N: usize>(
    fields: &mut std::str::SplitWhitespace<'_>,
) -> std::result::Result<[f64; N], String> {
    let mut values = [0.0; N];
    for value in &mut values {
        let field = fields.next().ok_or("missing coordinate")?;
        *value = field
            .parse()
            .map_err(|_| format!("invalid coordinate '{}'", field))?;
    }
    Ok(values)
}

/// Parse one `v`, `v/vt`, `v//vn` or `v/vt/vn` face corner into zero-based
/// indices. Negative indices count back from the latest record.
fn parse_corner(
    field: &str,
    num_positions: usize,
    num_tex_coords: usize,
) -> std::result::Result<(usize, Option<usize>), String> {
    let mut parts = field.split('/');
    let vertex = resolve_index(parts.next().unwrap_or(""), num_positions)?;
    let tex = match parts.next() {
        Some(t) if !t.is_empty() => Some(resolve_index(t, num_tex_coords)?),
        _ => None,
    };
    Ok((vertex, tex))
}

fn resolve_index(field: &str, count: usize) -> std::result::Result<usize, String> {
    let raw: i64 = field
        .parse()
        .map_err(|_| format!("invalid index '{}'", field))?;
    let resolved = if raw > 0 {
        raw - 1
    } else {
        count as i64 + raw
    };
    if raw == 0 || resolved < 0 || resolved >= count as i64 {
        return Err(format!("index {} out of range", raw));
    }
    Ok(resolved as usize)
}

fn into_uv_mesh<I: MeshIndex>(data: ObjData) -> Result<UvMesh<I>> {
    let mesh = build_from_triangles(&data.positions, &data.faces)?;
    let mut uv_mesh = UvMesh::new(mesh);
    let (mesh, overlay) = uv_mesh.layer_parts_mut(0);

    let mut elements: HashMap<(usize, usize), ElementId<I>> = HashMap::new();
    for (fi, (face, tex)) in data.faces.iter().zip(&data.face_tex).enumerate() {
        let Some(tex) = tex else {
            continue;
        };
        let corners = mesh.face_triangle(FaceId::new(fi));
        let mut tri = [ElementId::invalid(); 3];
        for k in 0..3 {
            tri[k] = *elements
                .entry((face[k], tex[k]))
                .or_insert_with(|| overlay.append_element(data.tex_coords[tex[k]], corners[k]));
        }
        overlay.set_triangle(mesh, FaceId::new(fi), tri);
    }
    log::debug!(
        "obj: {} vertices, {} faces, {} uv elements",
        data.positions.len(),
        data.faces.len(),
        elements.len()
    );
    Ok(uv_mesh)
}

fn write_obj<W: Write, I: MeshIndex>(
    writer: &mut W,
    mesh: &HalfEdgeMesh<I>,
    overlay: Option<&UvOverlay<I>>,
) -> std::io::Result<()> {
    for v in mesh.vertex_ids() {
        let p = mesh.position(v);
        writeln!(writer, "v {} {} {}", p.x, p.y, p.z)?;
    }

    let mut tex_index: HashMap<ElementId<I>, usize> = HashMap::new();
    if let Some(overlay) = overlay {
        for e in overlay.element_ids() {
            let uv = overlay.uv(e);
            tex_index.insert(e, tex_index.len() + 1);
            writeln!(writer, "vt {} {}", uv.x, uv.y)?;
        }
    }

    for f in mesh.face_ids() {
        let [a, b, c] = mesh.face_triangle(f).map(|v| v.index() + 1);
        let tri = overlay.and_then(|o| o.triangle(f));
        match tri.map(|t| t.map(|e| tex_index.get(&e).copied())) {
            Some([Some(ta), Some(tb), Some(tc)]) => {
                writeln!(writer, "f {}/{} {}/{} {}/{}", a, ta, b, tb, c, tc)?
            }
            _ => writeln!(writer, "f {} {} {}", a, b, c)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::uv_islands;
    use crate::test_meshes::square_mesh;

    const TEXTURED_QUAD: &str = "\
# two triangles with a seam on the diagonal
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vt 2 2
vt 3 3
f 1/1 2/2 3/3
f 1/4/1 3/5/1 4/3/1
";

    #[test]
    fn test_parse_textured_quad() {
        let data = parse(TEXTURED_QUAD.as_bytes()).unwrap();
        assert_eq!(data.positions.len(), 4);
        assert_eq!(data.tex_coords.len(), 5);
        assert_eq!(data.faces, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(data.face_tex[1], Some([3, 4, 2]));

        let uv_mesh: UvMesh = into_uv_mesh(data).unwrap();
        let mesh = uv_mesh.mesh();
        let overlay = uv_mesh.uv_layer(0).unwrap();
        assert_eq!(overlay.element_count(), 6);
        assert_eq!(uv_islands(mesh, overlay, None).len(), 2);
        let e = overlay.triangle(FaceId::new(1)).unwrap()[1];
        assert_eq!(overlay.uv(e), Point2::new(3.0, 3.0));
    }

    #[test]
    fn test_parse_polygon_and_negative_indices() {
        let text = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf -4 -3 -2 -1\n";
        let data = parse(text.as_bytes()).unwrap();
        assert_eq!(data.faces, vec![[0, 1, 2], [0, 2, 3]]);
        assert!(data.face_tex.iter().all(Option::is_none));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("v 0 0\n".as_bytes()).unwrap_err().contains("line 1"));
        assert!(parse("v 0 0 0\nf 1 2 3\n".as_bytes()).is_err());
        assert!(parse("v 0 0 0\nv 1 0 0\nf 1 2\n".as_bytes()).is_err());
    }

    #[test]
    fn test_write_then_parse_keeps_seams() {
        let mut uv_mesh = UvMesh::new(square_mesh());
        crate::algo::uv::UvEditor::new(&mut uv_mesh, 0, false)
            .unwrap()
            .set_per_triangle_uvs(None, 1.0, None)
            .unwrap();

        let mut bytes = Vec::new();
        write_obj(&mut bytes, uv_mesh.mesh(), uv_mesh.uv_layer(0)).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with("vt ")).count(), 6);

        let reloaded: UvMesh = into_uv_mesh(parse(text.as_bytes()).unwrap()).unwrap();
        let overlay = reloaded.uv_layer(0).unwrap();
        assert_eq!(uv_islands(reloaded.mesh(), overlay, None).len(), 2);
    }
}
