use std::io::Cursor;

/// EXIF Orientationから時計回りの回転角を取得
///
/// 6 → 90, 3 → 180, 8 → 270。タグなし・読み取り失敗・反転系の値は 0。
pub fn orientation_degrees(bytes: &[u8]) -> i32 {
    let mut cursor = Cursor::new(bytes);
    let exif = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(exif) => exif,
        Err(_) => return 0,
    };

    let orientation = exif
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|field| field.value.get_uint(0))
        .unwrap_or(1);

    degrees_for_orientation(orientation)
}

fn degrees_for_orientation(orientation: u32) -> i32 {
    match orientation {
        6 => 90,
        3 => 180,
        8 => 270,
        _ => 0,
    }
}
