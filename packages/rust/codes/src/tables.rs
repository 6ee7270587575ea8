//! Static code tables for the cadastral registry.
//!
//! Reference: SSB KLASS classification 64 (NS 3457 building types).
//! The registry export carries internal building-type ids (0-127) which
//! have to be translated to classification codes before any lookup.

/// Internal building-type id → classification code. Id 0 is the empty code.
pub static INTERNAL_ID_TO_CODE: &[(u32, u32)] = &[
    (1, 111),
    (2, 112),
    (3, 113),
    (4, 121),
    (5, 122),
    (6, 123),
    (7, 124),
    (8, 131),
    (9, 133),
    (10, 135),
    (11, 136),
    (12, 141),
    (13, 142),
    (14, 143),
    (15, 144),
    (16, 145),
    (17, 146),
    (18, 151),
    (19, 152),
    (20, 159),
    (21, 161),
    (22, 162),
    (23, 163),
    (24, 171),
    (25, 172),
    (26, 181),
    (27, 182),
    (28, 183),
    (29, 193),
    (30, 199),
    (31, 211),
    (32, 212),
    (33, 214),
    (34, 216),
    (35, 219),
    (36, 221),
    (37, 223),
    (38, 229),
    (39, 231),
    (40, 232),
    (41, 233),
    (42, 239),
    (43, 241),
    (44, 243),
    (45, 244),
    (46, 245),
    (47, 248),
    (48, 249),
    (49, 311),
    (50, 312),
    (51, 313),
    (52, 319),
    (53, 321),
    (54, 322),
    (55, 323),
    (56, 329),
    (57, 330),
    (58, 411),
    (59, 412),
    (60, 415),
    (61, 416),
    (62, 419),
    (63, 429),
    (64, 431),
    (65, 439),
    (66, 441),
    (67, 449),
    (68, 511),
    (69, 512),
    (70, 519),
    (71, 521),
    (72, 522),
    (73, 523),
    (74, 524),
    (75, 529),
    (76, 531),
    (77, 532),
    (78, 533),
    (79, 539),
    (80, 611),
    (81, 612),
    (82, 613),
    (83, 614),
    (84, 615),
    (85, 616),
    (86, 619),
    (87, 621),
    (88, 623),
    (89, 629),
    (90, 641),
    (91, 642),
    (92, 643),
    (93, 649),
    (94, 651),
    (95, 652),
    (96, 653),
    (97, 654),
    (98, 655),
    (99, 659),
    (100, 661),
    (101, 662),
    (102, 663),
    (103, 669),
    (104, 671),
    (105, 672),
    (106, 673),
    (107, 674),
    (108, 675),
    (109, 679),
    (110, 719),
    (111, 721),
    (112, 722),
    (113, 723),
    (114, 729),
    (115, 731),
    (116, 732),
    (117, 739),
    (118, 819),
    (119, 821),
    (120, 822),
    (121, 823),
    (122, 824),
    (123, 825),
    (124, 829),
    (125, 830),
    (126, 840),
    (127, 999),
];

/// Classification code → Norwegian name, levels 1 (1-8), 2 (11-84) and 3 (111-999).
pub static BUILDING_TYPE_CODES: &[(u32, &str)] = &[
    (1, "Bolig"),
    (2, "Industri og lagerbygning"),
    (3, "Kontor- og forretningsbygning"),
    (4, "Samferdsels- og kommunikasjonsbygning"),
    (5, "Hotell- og restaurantbygning"),
    (6, "Kultur- og forskningsbygning"),
    (7, "Helsebygning"),
    (8, "Fengsel, beredskapsbygning mv."),
    (11, "Enebolig"),
    (12, "Tomannsbolig"),
    (13, "Rekkehus, kjedehus, andre småhus"),
    (14, "Store boligbygg"),
    (15, "Bygning for bofellesskap"),
    (16, "Fritidsbolig"),
    (17, "Koie, seterhus og lignende"),
    (18, "Garasje og uthus til bolig"),
    (19, "Annen boligbygning"),
    (21, "Industribygning"),
    (22, "Energiforsyningsbygning"),
    (23, "Lagerbygning"),
    (24, "Fiskeri- og landbruksbygning"),
    (31, "Kontorbygning"),
    (32, "Forretningsbygning"),
    (41, "Ekspedisjonsbygning, terminal"),
    (42, "Telekommunikasjonsbygning"),
    (43, "Garasje- og hangarbygning"),
    (44, "Veg- og trafikktilsynsbygning"),
    (51, "Hotellbygning"),
    (52, "Bygning for overnatting"),
    (53, "Restaurantbygning"),
    (61, "Skolebygning"),
    (62, "Universitets- og høgskolebygning"),
    (64, "Museums- og biblioteksbygning"),
    (65, "Idrettsbygning"),
    (66, "Kulturhus"),
    (67, "Bygning for religiøse aktiviteter"),
    (71, "Sykehus"),
    (72, "Sykehjem"),
    (73, "Primærhelsebygning"),
    (81, "Fengselsbygning"),
    (82, "Beredskapsbygning"),
    (83, "Monument"),
    (84, "Offentlig toalett"),
    (111, "Enebolig"),
    (112, "Enebolig med hybelleilighet, sokkelleilighet o.l."),
    (113, "Våningshus"),
    (121, "Tomannsbolig, vertikaldelt"),
    (122, "Tomannsbolig, horisontaldelt"),
    (123, "Våningshus, tomannsbolig, vertikaldelt"),
    (124, "Våningshus, tomannsbolig, horisontaldelt"),
    (131, "Rekkehus"),
    (133, "Kjedehus inkl. atriumhus"),
    (135, "Terrassehus"),
    (136, "Andre småhus med 3 boliger eller flere"),
    (141, "Store frittliggende boligbygg på 2 etasjer"),
    (142, "Store frittliggende boligbygg på 3 og 4 etasjer"),
    (143, "Store frittliggende boligbygg på 5 etasjer eller over"),
    (144, "Store sammenbygde boligbygg på 2 etasjer"),
    (145, "Store sammenbygde boligbygg på 3 og 4 etasjer"),
    (146, "Store sammenbygde boligbygg på 5 etasjer og over"),
    (151, "Bo- og servicesenter"),
    (152, "Studenthjem/studentboliger"),
    (159, "Annen bygning for bofellesskap"),
    (161, "Fritidsbygning (hytter, sommerhus o.l.)"),
    (162, "Helårsbolig benyttet som fritidsbolig"),
    (163, "Våningshus benyttet som fritidsbolig"),
    (171, "Seterhus, sel, rorbu o.l."),
    (172, "Skogs- og utmarkskoie, gamme"),
    (181, "Garasje, uthus, anneks knyttet til bolig"),
    (182, "Garasje, uthus, anneks knyttet til fritidsbolig"),
    (183, "Naust, båthus, sjøbu"),
    (193, "Boligbrakker"),
    (199, "Annen boligbygning (f.eks. sekundærbolig reindrift)"),
    (211, "Fabrikkbygning"),
    (212, "Verkstedbygning"),
    (214, "Bygning for renseanlegg"),
    (216, "Bygning for vannforsyning, bl.a. pumpestasjon"),
    (219, "Annen industribygning"),
    (221, "Kraftstasjon (>15 000 kVA)"),
    (223, "Transformatorstasjon (>10 000 kVA)"),
    (229, "Annen energiforsyningsbygning"),
    (231, "Lagerhall"),
    (232, "Kjøle- og fryselager"),
    (233, "Silobygning"),
    (239, "Annen lagerbygning"),
    (
        241,
        "Hus for dyr, fôrlager, strølager, frukt- og grønnsakslager, landbrukssilo, høy-/korntørke",
    ),
    (243, "Veksthus"),
    (244, "Driftsbygning for fiske og fangst, inkl. oppdrettsanlegg"),
    (245, "Naust/redskapshus for fiske"),
    (248, "Annen fiskeri- og fangstbygning"),
    (249, "Annen landbruksbygning"),
    (311, "Kontor- og administrasjonsbygning, rådhus"),
    (312, "Bankbygning, posthus"),
    (313, "Mediebygning"),
    (319, "Annen kontorbygning"),
    (321, "Kjøpesenter, varehus"),
    (322, "Butikkbygning"),
    (323, "Bensinstasjon"),
    (329, "Annen forretningsbygning"),
    (330, "Messe- og kongressbygning"),
    (411, "Ekspedisjonsbygning, flyterminal, kontrolltårn"),
    (412, "Jernbane- og T-banestasjon"),
    (415, "Godsterminal"),
    (416, "Postterminal"),
    (419, "Annen ekspedisjons- og terminalbygning"),
    (429, "Telekommunikasjonsbygning"),
    (431, "Parkeringshus"),
    (439, "Annen garasje- hangarbygning"),
    (441, "Trafikktilsynsbygning"),
    (449, "Annen veg- og trafikktilsynsbygning"),
    (511, "Hotellbygning"),
    (512, "Motellbygning"),
    (519, "Annen hotellbygning"),
    (521, "Hospits, pensjonat"),
    (522, "Vandrerhjem, feriehjem/-koloni, turisthytte"),
    (523, "Appartement"),
    (524, "Campinghytte/utleiehytte"),
    (529, "Annen bygning for overnatting"),
    (531, "Restaurantbygning, kafébygning"),
    (532, "Sentralkjøkken, kantinebygning"),
    (533, "Gatekjøkken, kioskbygning"),
    (539, "Annen restaurantbygning"),
    (611, "Lekepark"),
    (612, "Barnehage"),
    (613, "Barneskole"),
    (614, "Ungdomsskole"),
    (615, "Kombinert barne- og ungdomsskole"),
    (616, "Videregående skole"),
    (619, "Annen skolebygning"),
    (621, "Universitets- og høgskolebygning med integrerte funksjoner, auditorium, lesesal o.a."),
    (623, "Laboratoriebygning"),
    (629, "Annen universitets-, høgskole- og forskningsbygning"),
    (641, "Museum, kunstgalleri"),
    (642, "Bibliotek, mediatek"),
    (643, "Zoologisk og botanisk hage"),
    (649, "Annen museums- og bibliotekbygning"),
    (651, "Idrettshall"),
    (652, "Ishall"),
    (653, "Svømmehall"),
    (654, "Tribune og idrettsgarderobe"),
    (655, "Helsestudio"),
    (659, "Annen idrettsbygning"),
    (661, "Kinobygning, teaterbygning, opera/konserthus"),
    (662, "Samfunnshus, grendehus"),
    (663, "Diskotek"),
    (669, "Annet kulturhus"),
    (671, "Kirke, kapell"),
    (672, "Bedehus, menighetshus"),
    (673, "Krematorium, gravkapell, bårehus"),
    (674, "Synagoge, moské"),
    (675, "Kloster"),
    (679, "Annen bygning for religiøse aktiviteter"),
    (719, "Sykehus"),
    (721, "Sykehjem"),
    (722, "Bo- og behandlingssenter, aldershjem"),
    (723, "Rehabiliteringsinstitusjon, kurbad"),
    (729, "Annet sykehjem"),
    (731, "Klinikk, legekontor/-senter/-vakt"),
    (732, "Helse- og sosialsenter, helsestasjon"),
    (739, "Annen primærhelsebygning"),
    (819, "Fengselsbygning"),
    (821, "Politistasjon"),
    (822, "Brannstasjon, ambulansestasjon"),
    (823, "Fyrstasjon, losstasjon"),
    (824, "Stasjon for radarovervåkning av fly- og/eller skipstrafikk"),
    (825, "Tilfluktsrom/bunker"),
    (829, "Annen beredskapsbygning"),
    (830, "Monument"),
    (840, "Offentlig toalett"),
    (999, "Ukjent bygningstype"),
];

pub static BUILDING_STATUS_CODES: &[(u32, &str)] = &[
    (0, "Rammetillatelse"),
    (1, "Igangsettingstillatelse"),
    (2, "Midlertidig brukstillatelse"),
    (3, "Ferdigattest"),
    (4, "Tatt i bruk"),
    (5, "Meldingssak registrer tiltak"),
    (6, "Meldingssak tiltak fullført"),
    (7, "Tiltak unntatt fra byggesaksbehandling"),
    (8, "Bygning godkjent for riving/brenning"),
    (9, "Bygning revet/brent"),
    (10, "Bygging avlyst"),
    (11, "Bygning flyttet"),
    (12, "Bygningsnummer utgått"),
    (13, "Fritatt for søknadsplikt"),
    (14, "Endre bygningsdata"),
    (15, "Tilbygg opprettet som egen bygning"),
    (16, "Bygg etablert som tilbygg på annen bygning"),
    (17, "Splitt bygning"),
    (18, "Data fra bygningsendring overført"),
];

pub static OWNERSHIP_TYPE_CODES: &[(u32, &str)] = &[
    (0, "Hjemmelshaver"),
    (1, "Kommune/offentlig eier"),
    (11, "Fester"),
    (18, "Rettighetsforhold"),
    (19, "Annet tinglyst eierforhold"),
];

/// Status codes kept for downstream analysis: completed, in use, exempt and
/// administrative updates of existing buildings.
pub const INCLUDED_BUILDING_STATUS_CODE_IDS: &[i64] = &[2, 3, 4, 6, 7, 8, 13, 14, 15, 16, 17, 18];

/// Status codes split off: permits not yet built, demolished, withdrawn, moved.
pub const EXCLUDED_BUILDING_STATUS_CODE_IDS: &[i64] = &[0, 1, 5, 9, 10, 11, 12];

/// Ownership role code for a registered title holder.
pub const QUALIFYING_OWNER_ROLE: i64 = 0;

/// Look up a code in one of the `(code, name)` tables above.
pub(crate) fn lookup(table: &'static [(u32, &'static str)], code: u32) -> Option<&'static str> {
    table.iter().find(|(c, _)| *c == code).map(|(_, name)| *name)
}
