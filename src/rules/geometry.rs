use nalgebra::Vector3;

use crate::pose::Landmark;

/// ゼロ除算回避用
pub const EPSILON: f32 = 1e-6;

/// 画像座標系の上方向（Y は下が正なので -Y）
fn vertical() -> Vector3<f32> {
    Vector3::new(0.0, -1.0, 0.0)
}

/// 2点の中点（visibility は 1 固定）
pub fn midpoint(a: &Landmark, b: &Landmark) -> Landmark {
    Landmark::new(
        (a.x + b.x) * 0.5,
        (a.y + b.y) * 0.5,
        (a.z + b.z) * 0.5,
        1.0,
    )
}

/// from → to のベクトル
pub fn vector(from: &Landmark, to: &Landmark) -> Vector3<f32> {
    to.position() - from.position()
}

fn angle_between(u: &Vector3<f32>, v: &Vector3<f32>, norm_product: f32) -> f32 {
    let cos = (u.dot(v) / (norm_product + EPSILON)).clamp(-1.0, 1.0);
    cos.acos().to_degrees()
}

/// 頂点 b における b→a と b→c のなす角（度）
pub fn angle(a: &Landmark, b: &Landmark, c: &Landmark) -> f32 {
    let ba = vector(b, a);
    let bc = vector(b, c);
    angle_between(&ba, &bc, ba.norm() * bc.norm())
}

/// ベクトルと鉛直方向 (0, -1, 0) のなす角（度）
pub fn angle_to_vertical(v: &Vector3<f32>) -> f32 {
    angle_between(v, &vertical(), v.norm())
}

/// 直線 p1–p2 上で x における y 座標
/// p1 と p2 の x がほぼ同じなら p1.y を返す
pub fn line_y_at_x(p1: &Landmark, p2: &Landmark, x: f32) -> f32 {
    let dx = p2.x - p1.x;
    if dx.abs() < EPSILON {
        return p1.y;
    }
    let t = (x - p1.x) / dx;
    p1.y + t * (p2.y - p1.y)
}
