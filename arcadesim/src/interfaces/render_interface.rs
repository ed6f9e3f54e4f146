/// VehicleTransform is what the renderer needs to place one car per frame.
/// * `position` - (m) world position, y is up
/// * `yaw` - (rad) heading around the y axis
/// * `wheel_spin` - (rad) spin angle per wheel (FL, FR, RL, RR)
/// * `wheel_steer` - (rad) front wheel steering angle
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VehicleTransform {
    pub position: [f64; 3],
    pub yaw: f64,
    pub wheel_spin: [f64; 4],
    pub wheel_steer: f64,
}

/// RenderSink is implemented by the scene layer. It is called once per tick per car.
pub trait RenderSink {
    fn set_transform(&mut self, entity_id: usize, transform: &VehicleTransform);
}

/// TransformBuffer keeps the latest transform of every car, e.g. for a headless frontend.
#[derive(Debug, Clone, Default)]
pub struct TransformBuffer {
    pub transforms: Vec<Option<VehicleTransform>>,
    pub no_updates: u64,
}

impl RenderSink for TransformBuffer {
    fn set_transform(&mut self, entity_id: usize, transform: &VehicleTransform) {
        if self.transforms.len() <= entity_id {
            self.transforms.resize(entity_id + 1, None);
        }
        self.transforms[entity_id] = Some(*transform);
        self.no_updates += 1;
    }
}
