/// Slice orientations. Axial is also called transverse and coronal is also
/// called frontal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Axial,
    Coronal,
    Sagittal,
}

impl Orientation {
    pub const ALL: [Orientation; 3] = [
        Orientation::Sagittal,
        Orientation::Coronal,
        Orientation::Axial,
    ];

    /// Index of the patient axis (x = 0, y = 1, z = 2) normal to the slices.
    pub fn normal_axis(self) -> usize {
        match self {
            Orientation::Sagittal => 0,
            Orientation::Coronal => 1,
            Orientation::Axial => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Orientation::Axial => "axial",
            Orientation::Coronal => "coronal",
            Orientation::Sagittal => "sagittal",
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub enum SortBy {
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}
