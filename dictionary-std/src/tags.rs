//! Data element tag declarations
//!
//! This module contains a curated subset of the attributes
//! of the standard data dictionary,
//! as tag constants and as dictionary entries.

use dcmstream_core::dictionary::{DataDictionaryEntryRef, TagRange::*};
use dcmstream_core::header::{Tag, VR};

/// FileMetaInformationGroupLength (0002,0000) UL
#[rustfmt::skip]
pub const FILE_META_INFORMATION_GROUP_LENGTH: Tag = Tag(0x0002, 0x0000);
/// FileMetaInformationVersion (0002,0001) OB
#[rustfmt::skip]
pub const FILE_META_INFORMATION_VERSION: Tag = Tag(0x0002, 0x0001);
/// MediaStorageSOPClassUID (0002,0002) UI
#[rustfmt::skip]
pub const MEDIA_STORAGE_SOP_CLASS_UID: Tag = Tag(0x0002, 0x0002);
/// MediaStorageSOPInstanceUID (0002,0003) UI
#[rustfmt::skip]
pub const MEDIA_STORAGE_SOP_INSTANCE_UID: Tag = Tag(0x0002, 0x0003);
/// TransferSyntaxUID (0002,0010) UI
#[rustfmt::skip]
pub const TRANSFER_SYNTAX_UID: Tag = Tag(0x0002, 0x0010);
/// ImplementationClassUID (0002,0012) UI
#[rustfmt::skip]
pub const IMPLEMENTATION_CLASS_UID: Tag = Tag(0x0002, 0x0012);
/// ImplementationVersionName (0002,0013) SH
#[rustfmt::skip]
pub const IMPLEMENTATION_VERSION_NAME: Tag = Tag(0x0002, 0x0013);
/// SourceApplicationEntityTitle (0002,0016) AE
#[rustfmt::skip]
pub const SOURCE_APPLICATION_ENTITY_TITLE: Tag = Tag(0x0002, 0x0016);
/// SendingApplicationEntityTitle (0002,0017) AE
#[rustfmt::skip]
pub const SENDING_APPLICATION_ENTITY_TITLE: Tag = Tag(0x0002, 0x0017);
/// ReceivingApplicationEntityTitle (0002,0018) AE
#[rustfmt::skip]
pub const RECEIVING_APPLICATION_ENTITY_TITLE: Tag = Tag(0x0002, 0x0018);
/// PrivateInformationCreatorUID (0002,0100) UI
#[rustfmt::skip]
pub const PRIVATE_INFORMATION_CREATOR_UID: Tag = Tag(0x0002, 0x0100);
/// PrivateInformation (0002,0102) OB
#[rustfmt::skip]
pub const PRIVATE_INFORMATION: Tag = Tag(0x0002, 0x0102);
/// SpecificCharacterSet (0008,0005) CS
#[rustfmt::skip]
pub const SPECIFIC_CHARACTER_SET: Tag = Tag(0x0008, 0x0005);
/// ImageType (0008,0008) CS
#[rustfmt::skip]
pub const IMAGE_TYPE: Tag = Tag(0x0008, 0x0008);
/// InstanceCreationDate (0008,0012) DA
#[rustfmt::skip]
pub const INSTANCE_CREATION_DATE: Tag = Tag(0x0008, 0x0012);
/// InstanceCreationTime (0008,0013) TM
#[rustfmt::skip]
pub const INSTANCE_CREATION_TIME: Tag = Tag(0x0008, 0x0013);
/// SOPClassUID (0008,0016) UI
#[rustfmt::skip]
pub const SOP_CLASS_UID: Tag = Tag(0x0008, 0x0016);
/// SOPInstanceUID (0008,0018) UI
#[rustfmt::skip]
pub const SOP_INSTANCE_UID: Tag = Tag(0x0008, 0x0018);
/// StudyDate (0008,0020) DA
#[rustfmt::skip]
pub const STUDY_DATE: Tag = Tag(0x0008, 0x0020);
/// SeriesDate (0008,0021) DA
#[rustfmt::skip]
pub const SERIES_DATE: Tag = Tag(0x0008, 0x0021);
/// AcquisitionDate (0008,0022) DA
#[rustfmt::skip]
pub const ACQUISITION_DATE: Tag = Tag(0x0008, 0x0022);
/// ContentDate (0008,0023) DA
#[rustfmt::skip]
pub const CONTENT_DATE: Tag = Tag(0x0008, 0x0023);
/// AcquisitionDateTime (0008,002A) DT
#[rustfmt::skip]
pub const ACQUISITION_DATE_TIME: Tag = Tag(0x0008, 0x002A);
/// StudyTime (0008,0030) TM
#[rustfmt::skip]
pub const STUDY_TIME: Tag = Tag(0x0008, 0x0030);
/// SeriesTime (0008,0031) TM
#[rustfmt::skip]
pub const SERIES_TIME: Tag = Tag(0x0008, 0x0031);
/// AcquisitionTime (0008,0032) TM
#[rustfmt::skip]
pub const ACQUISITION_TIME: Tag = Tag(0x0008, 0x0032);
/// ContentTime (0008,0033) TM
#[rustfmt::skip]
pub const CONTENT_TIME: Tag = Tag(0x0008, 0x0033);
/// AccessionNumber (0008,0050) SH
#[rustfmt::skip]
pub const ACCESSION_NUMBER: Tag = Tag(0x0008, 0x0050);
/// Modality (0008,0060) CS
#[rustfmt::skip]
pub const MODALITY: Tag = Tag(0x0008, 0x0060);
/// ConversionType (0008,0064) CS
#[rustfmt::skip]
pub const CONVERSION_TYPE: Tag = Tag(0x0008, 0x0064);
/// Manufacturer (0008,0070) LO
#[rustfmt::skip]
pub const MANUFACTURER: Tag = Tag(0x0008, 0x0070);
/// InstitutionName (0008,0080) LO
#[rustfmt::skip]
pub const INSTITUTION_NAME: Tag = Tag(0x0008, 0x0080);
/// InstitutionAddress (0008,0081) ST
#[rustfmt::skip]
pub const INSTITUTION_ADDRESS: Tag = Tag(0x0008, 0x0081);
/// ReferringPhysicianName (0008,0090) PN
#[rustfmt::skip]
pub const REFERRING_PHYSICIAN_NAME: Tag = Tag(0x0008, 0x0090);
/// CodeValue (0008,0100) SH
#[rustfmt::skip]
pub const CODE_VALUE: Tag = Tag(0x0008, 0x0100);
/// CodingSchemeDesignator (0008,0102) SH
#[rustfmt::skip]
pub const CODING_SCHEME_DESIGNATOR: Tag = Tag(0x0008, 0x0102);
/// CodeMeaning (0008,0104) LO
#[rustfmt::skip]
pub const CODE_MEANING: Tag = Tag(0x0008, 0x0104);
/// StationName (0008,1010) SH
#[rustfmt::skip]
pub const STATION_NAME: Tag = Tag(0x0008, 0x1010);
/// StudyDescription (0008,1030) LO
#[rustfmt::skip]
pub const STUDY_DESCRIPTION: Tag = Tag(0x0008, 0x1030);
/// SeriesDescription (0008,103E) LO
#[rustfmt::skip]
pub const SERIES_DESCRIPTION: Tag = Tag(0x0008, 0x103E);
/// InstitutionalDepartmentName (0008,1040) LO
#[rustfmt::skip]
pub const INSTITUTIONAL_DEPARTMENT_NAME: Tag = Tag(0x0008, 0x1040);
/// PerformingPhysicianName (0008,1050) PN
#[rustfmt::skip]
pub const PERFORMING_PHYSICIAN_NAME: Tag = Tag(0x0008, 0x1050);
/// OperatorsName (0008,1070) PN
#[rustfmt::skip]
pub const OPERATORS_NAME: Tag = Tag(0x0008, 0x1070);
/// ManufacturerModelName (0008,1090) LO
#[rustfmt::skip]
pub const MANUFACTURER_MODEL_NAME: Tag = Tag(0x0008, 0x1090);
/// ReferencedStudySequence (0008,1110) SQ
#[rustfmt::skip]
pub const REFERENCED_STUDY_SEQUENCE: Tag = Tag(0x0008, 0x1110);
/// ReferencedSeriesSequence (0008,1115) SQ
#[rustfmt::skip]
pub const REFERENCED_SERIES_SEQUENCE: Tag = Tag(0x0008, 0x1115);
/// ReferencedImageSequence (0008,1140) SQ
#[rustfmt::skip]
pub const REFERENCED_IMAGE_SEQUENCE: Tag = Tag(0x0008, 0x1140);
/// ReferencedSOPClassUID (0008,1150) UI
#[rustfmt::skip]
pub const REFERENCED_SOP_CLASS_UID: Tag = Tag(0x0008, 0x1150);
/// ReferencedSOPInstanceUID (0008,1155) UI
#[rustfmt::skip]
pub const REFERENCED_SOP_INSTANCE_UID: Tag = Tag(0x0008, 0x1155);
/// DerivationDescription (0008,2111) ST
#[rustfmt::skip]
pub const DERIVATION_DESCRIPTION: Tag = Tag(0x0008, 0x2111);
/// DerivationCodeSequence (0008,9215) SQ
#[rustfmt::skip]
pub const DERIVATION_CODE_SEQUENCE: Tag = Tag(0x0008, 0x9215);
/// PatientName (0010,0010) PN
#[rustfmt::skip]
pub const PATIENT_NAME: Tag = Tag(0x0010, 0x0010);
/// PatientID (0010,0020) LO
#[rustfmt::skip]
pub const PATIENT_ID: Tag = Tag(0x0010, 0x0020);
/// IssuerOfPatientID (0010,0021) LO
#[rustfmt::skip]
pub const ISSUER_OF_PATIENT_ID: Tag = Tag(0x0010, 0x0021);
/// PatientBirthDate (0010,0030) DA
#[rustfmt::skip]
pub const PATIENT_BIRTH_DATE: Tag = Tag(0x0010, 0x0030);
/// PatientBirthTime (0010,0032) TM
#[rustfmt::skip]
pub const PATIENT_BIRTH_TIME: Tag = Tag(0x0010, 0x0032);
/// PatientSex (0010,0040) CS
#[rustfmt::skip]
pub const PATIENT_SEX: Tag = Tag(0x0010, 0x0040);
/// OtherPatientIDs (0010,1000) LO
#[rustfmt::skip]
pub const OTHER_PATIENT_IDS: Tag = Tag(0x0010, 0x1000);
/// OtherPatientNames (0010,1001) PN
#[rustfmt::skip]
pub const OTHER_PATIENT_NAMES: Tag = Tag(0x0010, 0x1001);
/// PatientAge (0010,1010) AS
#[rustfmt::skip]
pub const PATIENT_AGE: Tag = Tag(0x0010, 0x1010);
/// PatientSize (0010,1020) DS
#[rustfmt::skip]
pub const PATIENT_SIZE: Tag = Tag(0x0010, 0x1020);
/// PatientWeight (0010,1030) DS
#[rustfmt::skip]
pub const PATIENT_WEIGHT: Tag = Tag(0x0010, 0x1030);
/// EthnicGroup (0010,2160) SH
#[rustfmt::skip]
pub const ETHNIC_GROUP: Tag = Tag(0x0010, 0x2160);
/// PatientComments (0010,4000) LT
#[rustfmt::skip]
pub const PATIENT_COMMENTS: Tag = Tag(0x0010, 0x4000);
/// BodyPartExamined (0018,0015) CS
#[rustfmt::skip]
pub const BODY_PART_EXAMINED: Tag = Tag(0x0018, 0x0015);
/// SliceThickness (0018,0050) DS
#[rustfmt::skip]
pub const SLICE_THICKNESS: Tag = Tag(0x0018, 0x0050);
/// KVP (0018,0060) DS
#[rustfmt::skip]
pub const KVP: Tag = Tag(0x0018, 0x0060);
/// SpacingBetweenSlices (0018,0088) DS
#[rustfmt::skip]
pub const SPACING_BETWEEN_SLICES: Tag = Tag(0x0018, 0x0088);
/// DeviceSerialNumber (0018,1000) LO
#[rustfmt::skip]
pub const DEVICE_SERIAL_NUMBER: Tag = Tag(0x0018, 0x1000);
/// SoftwareVersions (0018,1020) LO
#[rustfmt::skip]
pub const SOFTWARE_VERSIONS: Tag = Tag(0x0018, 0x1020);
/// ProtocolName (0018,1030) LO
#[rustfmt::skip]
pub const PROTOCOL_NAME: Tag = Tag(0x0018, 0x1030);
/// ExposureTime (0018,1150) IS
#[rustfmt::skip]
pub const EXPOSURE_TIME: Tag = Tag(0x0018, 0x1150);
/// XRayTubeCurrent (0018,1151) IS
#[rustfmt::skip]
pub const X_RAY_TUBE_CURRENT: Tag = Tag(0x0018, 0x1151);
/// Exposure (0018,1152) IS
#[rustfmt::skip]
pub const EXPOSURE: Tag = Tag(0x0018, 0x1152);
/// PatientPosition (0018,5100) CS
#[rustfmt::skip]
pub const PATIENT_POSITION: Tag = Tag(0x0018, 0x5100);
/// StudyInstanceUID (0020,000D) UI
#[rustfmt::skip]
pub const STUDY_INSTANCE_UID: Tag = Tag(0x0020, 0x000D);
/// SeriesInstanceUID (0020,000E) UI
#[rustfmt::skip]
pub const SERIES_INSTANCE_UID: Tag = Tag(0x0020, 0x000E);
/// StudyID (0020,0010) SH
#[rustfmt::skip]
pub const STUDY_ID: Tag = Tag(0x0020, 0x0010);
/// SeriesNumber (0020,0011) IS
#[rustfmt::skip]
pub const SERIES_NUMBER: Tag = Tag(0x0020, 0x0011);
/// AcquisitionNumber (0020,0012) IS
#[rustfmt::skip]
pub const ACQUISITION_NUMBER: Tag = Tag(0x0020, 0x0012);
/// InstanceNumber (0020,0013) IS
#[rustfmt::skip]
pub const INSTANCE_NUMBER: Tag = Tag(0x0020, 0x0013);
/// PatientOrientation (0020,0020) CS
#[rustfmt::skip]
pub const PATIENT_ORIENTATION: Tag = Tag(0x0020, 0x0020);
/// ImagePositionPatient (0020,0032) DS
#[rustfmt::skip]
pub const IMAGE_POSITION_PATIENT: Tag = Tag(0x0020, 0x0032);
/// ImageOrientationPatient (0020,0037) DS
#[rustfmt::skip]
pub const IMAGE_ORIENTATION_PATIENT: Tag = Tag(0x0020, 0x0037);
/// FrameOfReferenceUID (0020,0052) UI
#[rustfmt::skip]
pub const FRAME_OF_REFERENCE_UID: Tag = Tag(0x0020, 0x0052);
/// PositionReferenceIndicator (0020,1040) LO
#[rustfmt::skip]
pub const POSITION_REFERENCE_INDICATOR: Tag = Tag(0x0020, 0x1040);
/// SliceLocation (0020,1041) DS
#[rustfmt::skip]
pub const SLICE_LOCATION: Tag = Tag(0x0020, 0x1041);
/// ImageComments (0020,4000) LT
#[rustfmt::skip]
pub const IMAGE_COMMENTS: Tag = Tag(0x0020, 0x4000);
/// SamplesPerPixel (0028,0002) US
#[rustfmt::skip]
pub const SAMPLES_PER_PIXEL: Tag = Tag(0x0028, 0x0002);
/// PhotometricInterpretation (0028,0004) CS
#[rustfmt::skip]
pub const PHOTOMETRIC_INTERPRETATION: Tag = Tag(0x0028, 0x0004);
/// PlanarConfiguration (0028,0006) US
#[rustfmt::skip]
pub const PLANAR_CONFIGURATION: Tag = Tag(0x0028, 0x0006);
/// NumberOfFrames (0028,0008) IS
#[rustfmt::skip]
pub const NUMBER_OF_FRAMES: Tag = Tag(0x0028, 0x0008);
/// FrameIncrementPointer (0028,0009) AT
#[rustfmt::skip]
pub const FRAME_INCREMENT_POINTER: Tag = Tag(0x0028, 0x0009);
/// Rows (0028,0010) US
#[rustfmt::skip]
pub const ROWS: Tag = Tag(0x0028, 0x0010);
/// Columns (0028,0011) US
#[rustfmt::skip]
pub const COLUMNS: Tag = Tag(0x0028, 0x0011);
/// PixelSpacing (0028,0030) DS
#[rustfmt::skip]
pub const PIXEL_SPACING: Tag = Tag(0x0028, 0x0030);
/// BitsAllocated (0028,0100) US
#[rustfmt::skip]
pub const BITS_ALLOCATED: Tag = Tag(0x0028, 0x0100);
/// BitsStored (0028,0101) US
#[rustfmt::skip]
pub const BITS_STORED: Tag = Tag(0x0028, 0x0101);
/// HighBit (0028,0102) US
#[rustfmt::skip]
pub const HIGH_BIT: Tag = Tag(0x0028, 0x0102);
/// PixelRepresentation (0028,0103) US
#[rustfmt::skip]
pub const PIXEL_REPRESENTATION: Tag = Tag(0x0028, 0x0103);
/// SmallestImagePixelValue (0028,0106) US
#[rustfmt::skip]
pub const SMALLEST_IMAGE_PIXEL_VALUE: Tag = Tag(0x0028, 0x0106);
/// LargestImagePixelValue (0028,0107) US
#[rustfmt::skip]
pub const LARGEST_IMAGE_PIXEL_VALUE: Tag = Tag(0x0028, 0x0107);
/// WindowCenter (0028,1050) DS
#[rustfmt::skip]
pub const WINDOW_CENTER: Tag = Tag(0x0028, 0x1050);
/// WindowWidth (0028,1051) DS
#[rustfmt::skip]
pub const WINDOW_WIDTH: Tag = Tag(0x0028, 0x1051);
/// RescaleIntercept (0028,1052) DS
#[rustfmt::skip]
pub const RESCALE_INTERCEPT: Tag = Tag(0x0028, 0x1052);
/// RescaleSlope (0028,1053) DS
#[rustfmt::skip]
pub const RESCALE_SLOPE: Tag = Tag(0x0028, 0x1053);
/// RescaleType (0028,1054) LO
#[rustfmt::skip]
pub const RESCALE_TYPE: Tag = Tag(0x0028, 0x1054);
/// LossyImageCompression (0028,2110) CS
#[rustfmt::skip]
pub const LOSSY_IMAGE_COMPRESSION: Tag = Tag(0x0028, 0x2110);
/// VOILUTSequence (0028,3010) SQ
#[rustfmt::skip]
pub const VOILUT_SEQUENCE: Tag = Tag(0x0028, 0x3010);
/// RequestedProcedureDescription (0032,1060) LO
#[rustfmt::skip]
pub const REQUESTED_PROCEDURE_DESCRIPTION: Tag = Tag(0x0032, 0x1060);
/// PerformedProcedureStepStartDate (0040,0244) DA
#[rustfmt::skip]
pub const PERFORMED_PROCEDURE_STEP_START_DATE: Tag = Tag(0x0040, 0x0244);
/// PerformedProcedureStepStartTime (0040,0245) TM
#[rustfmt::skip]
pub const PERFORMED_PROCEDURE_STEP_START_TIME: Tag = Tag(0x0040, 0x0245);
/// PerformedProcedureStepID (0040,0253) SH
#[rustfmt::skip]
pub const PERFORMED_PROCEDURE_STEP_ID: Tag = Tag(0x0040, 0x0253);
/// RequestAttributesSequence (0040,0275) SQ
#[rustfmt::skip]
pub const REQUEST_ATTRIBUTES_SEQUENCE: Tag = Tag(0x0040, 0x0275);
/// ValueType (0040,A040) CS
#[rustfmt::skip]
pub const VALUE_TYPE: Tag = Tag(0x0040, 0xA040);
/// ConceptNameCodeSequence (0040,A043) SQ
#[rustfmt::skip]
pub const CONCEPT_NAME_CODE_SEQUENCE: Tag = Tag(0x0040, 0xA043);
/// TextValue (0040,A160) UT
#[rustfmt::skip]
pub const TEXT_VALUE: Tag = Tag(0x0040, 0xA160);
/// ContentSequence (0040,A730) SQ
#[rustfmt::skip]
pub const CONTENT_SEQUENCE: Tag = Tag(0x0040, 0xA730);
/// RealWorldValueMappingSequence (0040,9096) SQ
#[rustfmt::skip]
pub const REAL_WORLD_VALUE_MAPPING_SEQUENCE: Tag = Tag(0x0040, 0x9096);
/// RadiopharmaceuticalInformationSequence (0054,0016) SQ
#[rustfmt::skip]
pub const RADIOPHARMACEUTICAL_INFORMATION_SEQUENCE: Tag = Tag(0x0054, 0x0016);
/// IconImageSequence (0088,0200) SQ
#[rustfmt::skip]
pub const ICON_IMAGE_SEQUENCE: Tag = Tag(0x0088, 0x0200);
/// StructureSetROISequence (3006,0020) SQ
#[rustfmt::skip]
pub const STRUCTURE_SET_ROI_SEQUENCE: Tag = Tag(0x3006, 0x0020);
/// SharedFunctionalGroupsSequence (5200,9229) SQ
#[rustfmt::skip]
pub const SHARED_FUNCTIONAL_GROUPS_SEQUENCE: Tag = Tag(0x5200, 0x9229);
/// PerFrameFunctionalGroupsSequence (5200,9230) SQ
#[rustfmt::skip]
pub const PER_FRAME_FUNCTIONAL_GROUPS_SEQUENCE: Tag = Tag(0x5200, 0x9230);
/// ExtendedOffsetTable (7FE0,0001) OV
#[rustfmt::skip]
pub const EXTENDED_OFFSET_TABLE: Tag = Tag(0x7FE0, 0x0001);
/// ExtendedOffsetTableLengths (7FE0,0002) OV
#[rustfmt::skip]
pub const EXTENDED_OFFSET_TABLE_LENGTHS: Tag = Tag(0x7FE0, 0x0002);
/// FloatPixelData (7FE0,0008) OF
#[rustfmt::skip]
pub const FLOAT_PIXEL_DATA: Tag = Tag(0x7FE0, 0x0008);
/// DoubleFloatPixelData (7FE0,0009) OD
#[rustfmt::skip]
pub const DOUBLE_FLOAT_PIXEL_DATA: Tag = Tag(0x7FE0, 0x0009);
/// PixelData (7FE0,0010) OB
#[rustfmt::skip]
pub const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);
/// DigitalSignaturesSequence (FFFA,FFFA) SQ
#[rustfmt::skip]
pub const DIGITAL_SIGNATURES_SEQUENCE: Tag = Tag(0xFFFA, 0xFFFA);
/// DataSetTrailingPadding (FFFC,FFFC) OB
#[rustfmt::skip]
pub const DATA_SET_TRAILING_PADDING: Tag = Tag(0xFFFC, 0xFFFC);
/// Item (FFFE,E000) UN
#[rustfmt::skip]
pub const ITEM: Tag = Tag(0xFFFE, 0xE000);
/// ItemDelimitationItem (FFFE,E00D) UN
#[rustfmt::skip]
pub const ITEM_DELIMITATION_ITEM: Tag = Tag(0xFFFE, 0xE00D);
/// SequenceDelimitationItem (FFFE,E0DD) UN
#[rustfmt::skip]
pub const SEQUENCE_DELIMITATION_ITEM: Tag = Tag(0xFFFE, 0xE0DD);
/// OverlayRows (60xx,0010) US
#[rustfmt::skip]
pub const OVERLAY_ROWS: Tag = Tag(0x6000, 0x0010);
/// OverlayColumns (60xx,0011) US
#[rustfmt::skip]
pub const OVERLAY_COLUMNS: Tag = Tag(0x6000, 0x0011);
/// OverlayType (60xx,0040) CS
#[rustfmt::skip]
pub const OVERLAY_TYPE: Tag = Tag(0x6000, 0x0040);
/// OverlayOrigin (60xx,0050) SS
#[rustfmt::skip]
pub const OVERLAY_ORIGIN: Tag = Tag(0x6000, 0x0050);
/// OverlayBitsAllocated (60xx,0100) US
#[rustfmt::skip]
pub const OVERLAY_BITS_ALLOCATED: Tag = Tag(0x6000, 0x0100);
/// OverlayBitPosition (60xx,0102) US
#[rustfmt::skip]
pub const OVERLAY_BIT_POSITION: Tag = Tag(0x6000, 0x0102);
/// OverlayData (60xx,3000) OW
#[rustfmt::skip]
pub const OVERLAY_DATA: Tag = Tag(0x6000, 0x3000);
/// CurveData (50xx,3000) OB
#[rustfmt::skip]
pub const CURVE_DATA: Tag = Tag(0x5000, 0x3000);
/// SourceImageIDs (0020,31xx) CS
#[rustfmt::skip]
pub const SOURCE_IMAGE_IDS: Tag = Tag(0x0020, 0x3100);

type E = DataDictionaryEntryRef<'static>;

#[rustfmt::skip]
pub(crate) const ENTRIES: &[E] = &[
    E { tag: Single(FILE_META_INFORMATION_GROUP_LENGTH), alias: "FileMetaInformationGroupLength", vr: VR::UL },
    E { tag: Single(FILE_META_INFORMATION_VERSION), alias: "FileMetaInformationVersion", vr: VR::OB },
    E { tag: Single(MEDIA_STORAGE_SOP_CLASS_UID), alias: "MediaStorageSOPClassUID", vr: VR::UI },
    E { tag: Single(MEDIA_STORAGE_SOP_INSTANCE_UID), alias: "MediaStorageSOPInstanceUID", vr: VR::UI },
    E { tag: Single(TRANSFER_SYNTAX_UID), alias: "TransferSyntaxUID", vr: VR::UI },
    E { tag: Single(IMPLEMENTATION_CLASS_UID), alias: "ImplementationClassUID", vr: VR::UI },
    E { tag: Single(IMPLEMENTATION_VERSION_NAME), alias: "ImplementationVersionName", vr: VR::SH },
    E { tag: Single(SOURCE_APPLICATION_ENTITY_TITLE), alias: "SourceApplicationEntityTitle", vr: VR::AE },
    E { tag: Single(SENDING_APPLICATION_ENTITY_TITLE), alias: "SendingApplicationEntityTitle", vr: VR::AE },
    E { tag: Single(RECEIVING_APPLICATION_ENTITY_TITLE), alias: "ReceivingApplicationEntityTitle", vr: VR::AE },
    E { tag: Single(PRIVATE_INFORMATION_CREATOR_UID), alias: "PrivateInformationCreatorUID", vr: VR::UI },
    E { tag: Single(PRIVATE_INFORMATION), alias: "PrivateInformation", vr: VR::OB },
    E { tag: Single(SPECIFIC_CHARACTER_SET), alias: "SpecificCharacterSet", vr: VR::CS },
    E { tag: Single(IMAGE_TYPE), alias: "ImageType", vr: VR::CS },
    E { tag: Single(INSTANCE_CREATION_DATE), alias: "InstanceCreationDate", vr: VR::DA },
    E { tag: Single(INSTANCE_CREATION_TIME), alias: "InstanceCreationTime", vr: VR::TM },
    E { tag: Single(SOP_CLASS_UID), alias: "SOPClassUID", vr: VR::UI },
    E { tag: Single(SOP_INSTANCE_UID), alias: "SOPInstanceUID", vr: VR::UI },
    E { tag: Single(STUDY_DATE), alias: "StudyDate", vr: VR::DA },
    E { tag: Single(SERIES_DATE), alias: "SeriesDate", vr: VR::DA },
    E { tag: Single(ACQUISITION_DATE), alias: "AcquisitionDate", vr: VR::DA },
    E { tag: Single(CONTENT_DATE), alias: "ContentDate", vr: VR::DA },
    E { tag: Single(ACQUISITION_DATE_TIME), alias: "AcquisitionDateTime", vr: VR::DT },
    E { tag: Single(STUDY_TIME), alias: "StudyTime", vr: VR::TM },
    E { tag: Single(SERIES_TIME), alias: "SeriesTime", vr: VR::TM },
    E { tag: Single(ACQUISITION_TIME), alias: "AcquisitionTime", vr: VR::TM },
    E { tag: Single(CONTENT_TIME), alias: "ContentTime", vr: VR::TM },
    E { tag: Single(ACCESSION_NUMBER), alias: "AccessionNumber", vr: VR::SH },
    E { tag: Single(MODALITY), alias: "Modality", vr: VR::CS },
    E { tag: Single(CONVERSION_TYPE), alias: "ConversionType", vr: VR::CS },
    E { tag: Single(MANUFACTURER), alias: "Manufacturer", vr: VR::LO },
    E { tag: Single(INSTITUTION_NAME), alias: "InstitutionName", vr: VR::LO },
    E { tag: Single(INSTITUTION_ADDRESS), alias: "InstitutionAddress", vr: VR::ST },
    E { tag: Single(REFERRING_PHYSICIAN_NAME), alias: "ReferringPhysicianName", vr: VR::PN },
    E { tag: Single(CODE_VALUE), alias: "CodeValue", vr: VR::SH },
    E { tag: Single(CODING_SCHEME_DESIGNATOR), alias: "CodingSchemeDesignator", vr: VR::SH },
    E { tag: Single(CODE_MEANING), alias: "CodeMeaning", vr: VR::LO },
    E { tag: Single(STATION_NAME), alias: "StationName", vr: VR::SH },
    E { tag: Single(STUDY_DESCRIPTION), alias: "StudyDescription", vr: VR::LO },
    E { tag: Single(SERIES_DESCRIPTION), alias: "SeriesDescription", vr: VR::LO },
    E { tag: Single(INSTITUTIONAL_DEPARTMENT_NAME), alias: "InstitutionalDepartmentName", vr: VR::LO },
    E { tag: Single(PERFORMING_PHYSICIAN_NAME), alias: "PerformingPhysicianName", vr: VR::PN },
    E { tag: Single(OPERATORS_NAME), alias: "OperatorsName", vr: VR::PN },
    E { tag: Single(MANUFACTURER_MODEL_NAME), alias: "ManufacturerModelName", vr: VR::LO },
    E { tag: Single(REFERENCED_STUDY_SEQUENCE), alias: "ReferencedStudySequence", vr: VR::SQ },
    E { tag: Single(REFERENCED_SERIES_SEQUENCE), alias: "ReferencedSeriesSequence", vr: VR::SQ },
    E { tag: Single(REFERENCED_IMAGE_SEQUENCE), alias: "ReferencedImageSequence", vr: VR::SQ },
    E { tag: Single(REFERENCED_SOP_CLASS_UID), alias: "ReferencedSOPClassUID", vr: VR::UI },
    E { tag: Single(REFERENCED_SOP_INSTANCE_UID), alias: "ReferencedSOPInstanceUID", vr: VR::UI },
    E { tag: Single(DERIVATION_DESCRIPTION), alias: "DerivationDescription", vr: VR::ST },
    E { tag: Single(DERIVATION_CODE_SEQUENCE), alias: "DerivationCodeSequence", vr: VR::SQ },
    E { tag: Single(PATIENT_NAME), alias: "PatientName", vr: VR::PN },
    E { tag: Single(PATIENT_ID), alias: "PatientID", vr: VR::LO },
    E { tag: Single(ISSUER_OF_PATIENT_ID), alias: "IssuerOfPatientID", vr: VR::LO },
    E { tag: Single(PATIENT_BIRTH_DATE), alias: "PatientBirthDate", vr: VR::DA },
    E { tag: Single(PATIENT_BIRTH_TIME), alias: "PatientBirthTime", vr: VR::TM },
    E { tag: Single(PATIENT_SEX), alias: "PatientSex", vr: VR::CS },
    E { tag: Single(OTHER_PATIENT_IDS), alias: "OtherPatientIDs", vr: VR::LO },
    E { tag: Single(OTHER_PATIENT_NAMES), alias: "OtherPatientNames", vr: VR::PN },
    E { tag: Single(PATIENT_AGE), alias: "PatientAge", vr: VR::AS },
    E { tag: Single(PATIENT_SIZE), alias: "PatientSize", vr: VR::DS },
    E { tag: Single(PATIENT_WEIGHT), alias: "PatientWeight", vr: VR::DS },
    E { tag: Single(ETHNIC_GROUP), alias: "EthnicGroup", vr: VR::SH },
    E { tag: Single(PATIENT_COMMENTS), alias: "PatientComments", vr: VR::LT },
    E { tag: Single(BODY_PART_EXAMINED), alias: "BodyPartExamined", vr: VR::CS },
    E { tag: Single(SLICE_THICKNESS), alias: "SliceThickness", vr: VR::DS },
    E { tag: Single(KVP), alias: "KVP", vr: VR::DS },
    E { tag: Single(SPACING_BETWEEN_SLICES), alias: "SpacingBetweenSlices", vr: VR::DS },
    E { tag: Single(DEVICE_SERIAL_NUMBER), alias: "DeviceSerialNumber", vr: VR::LO },
    E { tag: Single(SOFTWARE_VERSIONS), alias: "SoftwareVersions", vr: VR::LO },
    E { tag: Single(PROTOCOL_NAME), alias: "ProtocolName", vr: VR::LO },
    E { tag: Single(EXPOSURE_TIME), alias: "ExposureTime", vr: VR::IS },
    E { tag: Single(X_RAY_TUBE_CURRENT), alias: "XRayTubeCurrent", vr: VR::IS },
    E { tag: Single(EXPOSURE), alias: "Exposure", vr: VR::IS },
    E { tag: Single(PATIENT_POSITION), alias: "PatientPosition", vr: VR::CS },
    E { tag: Single(STUDY_INSTANCE_UID), alias: "StudyInstanceUID", vr: VR::UI },
    E { tag: Single(SERIES_INSTANCE_UID), alias: "SeriesInstanceUID", vr: VR::UI },
    E { tag: Single(STUDY_ID), alias: "StudyID", vr: VR::SH },
    E { tag: Single(SERIES_NUMBER), alias: "SeriesNumber", vr: VR::IS },
    E { tag: Single(ACQUISITION_NUMBER), alias: "AcquisitionNumber", vr: VR::IS },
    E { tag: Single(INSTANCE_NUMBER), alias: "InstanceNumber", vr: VR::IS },
    E { tag: Single(PATIENT_ORIENTATION), alias: "PatientOrientation", vr: VR::CS },
    E { tag: Single(IMAGE_POSITION_PATIENT), alias: "ImagePositionPatient", vr: VR::DS },
    E { tag: Single(IMAGE_ORIENTATION_PATIENT), alias: "ImageOrientationPatient", vr: VR::DS },
    E { tag: Single(FRAME_OF_REFERENCE_UID), alias: "FrameOfReferenceUID", vr: VR::UI },
    E { tag: Single(POSITION_REFERENCE_INDICATOR), alias: "PositionReferenceIndicator", vr: VR::LO },
    E { tag: Single(SLICE_LOCATION), alias: "SliceLocation", vr: VR::DS },
    E { tag: Single(IMAGE_COMMENTS), alias: "ImageComments", vr: VR::LT },
    E { tag: Single(SAMPLES_PER_PIXEL), alias: "SamplesPerPixel", vr: VR::US },
    E { tag: Single(PHOTOMETRIC_INTERPRETATION), alias: "PhotometricInterpretation", vr: VR::CS },
    E { tag: Single(PLANAR_CONFIGURATION), alias: "PlanarConfiguration", vr: VR::US },
    E { tag: Single(NUMBER_OF_FRAMES), alias: "NumberOfFrames", vr: VR::IS },
    E { tag: Single(FRAME_INCREMENT_POINTER), alias: "FrameIncrementPointer", vr: VR::AT },
    E { tag: Single(ROWS), alias: "Rows", vr: VR::US },
    E { tag: Single(COLUMNS), alias: "Columns", vr: VR::US },
    E { tag: Single(PIXEL_SPACING), alias: "PixelSpacing", vr: VR::DS },
    E { tag: Single(BITS_ALLOCATED), alias: "BitsAllocated", vr: VR::US },
    E { tag: Single(BITS_STORED), alias: "BitsStored", vr: VR::US },
    E { tag: Single(HIGH_BIT), alias: "HighBit", vr: VR::US },
    E { tag: Single(PIXEL_REPRESENTATION), alias: "PixelRepresentation", vr: VR::US },
    E { tag: Single(SMALLEST_IMAGE_PIXEL_VALUE), alias: "SmallestImagePixelValue", vr: VR::US },
    E { tag: Single(LARGEST_IMAGE_PIXEL_VALUE), alias: "LargestImagePixelValue", vr: VR::US },
    E { tag: Single(WINDOW_CENTER), alias: "WindowCenter", vr: VR::DS },
    E { tag: Single(WINDOW_WIDTH), alias: "WindowWidth", vr: VR::DS },
    E { tag: Single(RESCALE_INTERCEPT), alias: "RescaleIntercept", vr: VR::DS },
    E { tag: Single(RESCALE_SLOPE), alias: "RescaleSlope", vr: VR::DS },
    E { tag: Single(RESCALE_TYPE), alias: "RescaleType", vr: VR::LO },
    E { tag: Single(LOSSY_IMAGE_COMPRESSION), alias: "LossyImageCompression", vr: VR::CS },
    E { tag: Single(VOILUT_SEQUENCE), alias: "VOILUTSequence", vr: VR::SQ },
    E { tag: Single(REQUESTED_PROCEDURE_DESCRIPTION), alias: "RequestedProcedureDescription", vr: VR::LO },
    E { tag: Single(PERFORMED_PROCEDURE_STEP_START_DATE), alias: "PerformedProcedureStepStartDate", vr: VR::DA },
    E { tag: Single(PERFORMED_PROCEDURE_STEP_START_TIME), alias: "PerformedProcedureStepStartTime", vr: VR::TM },
    E { tag: Single(PERFORMED_PROCEDURE_STEP_ID), alias: "PerformedProcedureStepID", vr: VR::SH },
    E { tag: Single(REQUEST_ATTRIBUTES_SEQUENCE), alias: "RequestAttributesSequence", vr: VR::SQ },
    E { tag: Single(VALUE_TYPE), alias: "ValueType", vr: VR::CS },
    E { tag: Single(CONCEPT_NAME_CODE_SEQUENCE), alias: "ConceptNameCodeSequence", vr: VR::SQ },
    E { tag: Single(TEXT_VALUE), alias: "TextValue", vr: VR::UT },
    E { tag: Single(CONTENT_SEQUENCE), alias: "ContentSequence", vr: VR::SQ },
    E { tag: Single(REAL_WORLD_VALUE_MAPPING_SEQUENCE), alias: "RealWorldValueMappingSequence", vr: VR::SQ },
    E { tag: Single(RADIOPHARMACEUTICAL_INFORMATION_SEQUENCE), alias: "RadiopharmaceuticalInformationSequence", vr: VR::SQ },
    E { tag: Single(ICON_IMAGE_SEQUENCE), alias: "IconImageSequence", vr: VR::SQ },
    E { tag: Single(STRUCTURE_SET_ROI_SEQUENCE), alias: "StructureSetROISequence", vr: VR::SQ },
    E { tag: Single(SHARED_FUNCTIONAL_GROUPS_SEQUENCE), alias: "SharedFunctionalGroupsSequence", vr: VR::SQ },
    E { tag: Single(PER_FRAME_FUNCTIONAL_GROUPS_SEQUENCE), alias: "PerFrameFunctionalGroupsSequence", vr: VR::SQ },
    E { tag: Single(EXTENDED_OFFSET_TABLE), alias: "ExtendedOffsetTable", vr: VR::OV },
    E { tag: Single(EXTENDED_OFFSET_TABLE_LENGTHS), alias: "ExtendedOffsetTableLengths", vr: VR::OV },
    E { tag: Single(FLOAT_PIXEL_DATA), alias: "FloatPixelData", vr: VR::OF },
    E { tag: Single(DOUBLE_FLOAT_PIXEL_DATA), alias: "DoubleFloatPixelData", vr: VR::OD },
    E { tag: Single(PIXEL_DATA), alias: "PixelData", vr: VR::OB },
    E { tag: Single(DIGITAL_SIGNATURES_SEQUENCE), alias: "DigitalSignaturesSequence", vr: VR::SQ },
    E { tag: Single(DATA_SET_TRAILING_PADDING), alias: "DataSetTrailingPadding", vr: VR::OB },
    E { tag: Single(ITEM), alias: "Item", vr: VR::UN },
    E { tag: Single(ITEM_DELIMITATION_ITEM), alias: "ItemDelimitationItem", vr: VR::UN },
    E { tag: Single(SEQUENCE_DELIMITATION_ITEM), alias: "SequenceDelimitationItem", vr: VR::UN },
    E { tag: Group100(OVERLAY_ROWS), alias: "OverlayRows", vr: VR::US },
    E { tag: Group100(OVERLAY_COLUMNS), alias: "OverlayColumns", vr: VR::US },
    E { tag: Group100(OVERLAY_TYPE), alias: "OverlayType", vr: VR::CS },
    E { tag: Group100(OVERLAY_ORIGIN), alias: "OverlayOrigin", vr: VR::SS },
    E { tag: Group100(OVERLAY_BITS_ALLOCATED), alias: "OverlayBitsAllocated", vr: VR::US },
    E { tag: Group100(OVERLAY_BIT_POSITION), alias: "OverlayBitPosition", vr: VR::US },
    E { tag: Group100(OVERLAY_DATA), alias: "OverlayData", vr: VR::OW },
    E { tag: Group100(CURVE_DATA), alias: "CurveData", vr: VR::OB },
    E { tag: Element100(SOURCE_IMAGE_IDS), alias: "SourceImageIDs", vr: VR::CS },
];
